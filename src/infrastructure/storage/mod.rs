//! File Storage Implementations
//!
//! Concrete [`FileStorage`](crate::domain::services::FileStorage) backends.

pub mod local;

pub use local::LocalFileStorage;
