//! Domain Services
//!
//! Collaborator contracts the domain relies on but does not implement.

pub mod file_storage;

pub use file_storage::FileStorage;

#[cfg(test)]
pub use file_storage::MockFileStorage;
