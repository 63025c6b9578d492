//! # Crud Core Library
//!
//! This crate provides the data-access core of a posts / comments / users /
//! chats backend:
//! - A `where__{field}__{operator}` / `order__{field}` filter DSL parsed
//!   against static entity schemas
//! - Offset and cursor pagination with absolute `next` links
//! - Transaction-scoped write orchestration that keeps derived counters
//!   consistent
//! - PostgreSQL and in-memory storage backends
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, schemas and the query DSL
//! - **Application Layer**: Business logic services and DTOs
//! - **Infrastructure Layer**: Storage backends, transactions, repositories and file storage
//!
//! ## Module Structure
//!
//! ```text
//! crud_core/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, query DSL
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Database, repositories, metrics, file storage
//! +-- shared/         Common utilities (errors, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Shared utilities
pub mod shared;

// Composition root
pub mod startup;

// Telemetry and observability
pub mod telemetry;
