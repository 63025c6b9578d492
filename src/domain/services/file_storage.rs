//! File storage collaborator.
//!
//! Uploads land in a temporary folder before the request that references
//! them runs. Attaching an image only persists the reference; the file itself
//! is confirmed and promoted through this trait.

use async_trait::async_trait;

use crate::shared::error::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Fail with [`AppError::BadRequest`] when no uploaded file exists at
    /// `path` (relative to the temporary folder).
    async fn ensure_uploaded(&self, path: &str) -> Result<(), AppError>;

    /// Move an uploaded file into the public posts folder. Returns the
    /// public relative path.
    async fn promote(&self, path: &str) -> Result<String, AppError>;
}
