//! # Domain Layer
//!
//! The domain layer contains the core types of the backend. It is
//! independent of any storage engine.
//!
//! ## Structure
//!
//! - **entities**: Users, posts, comments, images, chats and their schemas
//! - **value_objects**: Typed values, field types, schemas and records
//! - **query**: The `where__` / `order__` filter DSL and query composition
//! - **services**: Collaborator contracts (file storage)

pub mod entities;
pub mod query;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
