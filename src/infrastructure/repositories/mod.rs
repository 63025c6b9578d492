//! Repository Implementations
//!
//! A single generic repository serves every entity. The entity's static
//! schema drives the backend, so adding an entity never needs new SQL.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crate::domain::{Comment, Post};
//! use crate::infrastructure::database::PgBackend;
//! use crate::infrastructure::repositories::EntityRepository;
//!
//! fn setup_repositories(backend: Arc<PgBackend>) {
//!     let posts = EntityRepository::<Post, _>::new(backend.clone());
//!     let comments = EntityRepository::<Comment, _>::new(backend);
//! }
//! ```

pub mod entity_repository;

pub use entity_repository::EntityRepository;
