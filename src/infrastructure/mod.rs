//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Storage backends (PostgreSQL, in-memory) and transaction management
//! - The generic entity repository
//! - Local file storage for uploaded images
//! - Prometheus metrics

pub mod database;
pub mod metrics;
pub mod repositories;
pub mod storage;
