//! Integration Tests Entry Point
//!
//! Tests are organized by module:
//! - `scenarios/` - end-to-end behaviour over the in-memory backend
//! - `common/` - Shared test utilities

mod common;
mod scenarios;
