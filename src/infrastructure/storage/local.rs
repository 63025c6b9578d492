//! Local filesystem storage.
//!
//! Uploads are written to `temp_dir` by the upload endpoint; promoting one
//! renames it into `public_dir/posts`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::config::StorageSettings;
use crate::domain::services::FileStorage;
use crate::shared::error::AppError;

/// Sub-folder of the public directory holding post images.
pub const POSTS_FOLDER: &str = "posts";

#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    temp_dir: PathBuf,
    public_dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(temp_dir: impl Into<PathBuf>, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            public_dir: public_dir.into(),
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(&settings.temp_dir, &settings.public_dir)
    }

    /// Only plain relative file names are accepted.
    fn sanitize(path: &str) -> Result<&Path, AppError> {
        let candidate = Path::new(path);
        let plain = !path.is_empty()
            && candidate
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if plain {
            Ok(candidate)
        } else {
            Err(AppError::BadRequest(format!("Invalid image path '{}'", path)))
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn ensure_uploaded(&self, path: &str) -> Result<(), AppError> {
        let source = self.temp_dir.join(Self::sanitize(path)?);
        match tokio::fs::metadata(&source).await {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(AppError::BadRequest(format!(
                "Uploaded file '{}' does not exist",
                path
            ))),
        }
    }

    async fn promote(&self, path: &str) -> Result<String, AppError> {
        let relative = Self::sanitize(path)?;
        let source = self.temp_dir.join(relative);
        let target_dir = self.public_dir.join(POSTS_FOLDER);
        let target = target_dir.join(relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create {}: {}", target_dir.display(), e)))?;
        }
        tokio::fs::rename(&source, &target)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to move {}: {}", source.display(), e)))?;

        tracing::debug!(from = %source.display(), to = %target.display(), "Promoted uploaded file");
        Ok(format!("{}/{}", POSTS_FOLDER, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("crud-core-{}-{}", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_promote_moves_file() {
        let root = scratch_dir("promote");
        let storage = LocalFileStorage::new(root.join("temp"), root.join("public"));
        tokio::fs::create_dir_all(root.join("temp")).await.unwrap();
        tokio::fs::write(root.join("temp/a.png"), b"png").await.unwrap();

        storage.ensure_uploaded("a.png").await.unwrap();
        let public = storage.promote("a.png").await.unwrap();

        assert_eq!(public, "posts/a.png");
        assert!(root.join("public/posts/a.png").exists());
        assert!(!root.join("temp/a.png").exists());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_upload_is_bad_request() {
        let root = scratch_dir("missing");
        let storage = LocalFileStorage::new(root.join("temp"), root.join("public"));
        assert!(matches!(
            storage.ensure_uploaded("nope.png").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let storage = LocalFileStorage::new("temp", "public");
        assert!(matches!(
            storage.ensure_uploaded("../etc/passwd").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(storage.promote("/abs.png").await.is_err());
    }
}
