//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use parking_lot::Mutex;

use crud_core::application::dto::{CreatePostRequest, CreateUserRequest};
use crud_core::config::{
    DatabaseSettings, PaginationSettings, ServerSettings, Settings, StorageSettings,
};
use crud_core::domain::services::FileStorage;
use crud_core::domain::{Caller, Role, User};
use crud_core::infrastructure::database::MemoryBackend;
use crud_core::shared::error::AppError;
use crud_core::startup::AppState;

/// File storage that knows a fixed set of uploads.
#[derive(Default)]
pub struct StubFileStorage {
    uploaded: Mutex<HashSet<String>>,
    promoted: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl StubFileStorage {
    pub fn with_uploads(paths: &[&str]) -> Self {
        Self {
            uploaded: Mutex::new(paths.iter().map(|p| p.to_string()).collect()),
            ..Self::default()
        }
    }

    /// Every upload check sleeps for `delay` first.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn promoted(&self) -> Vec<String> {
        self.promoted.lock().clone()
    }
}

#[async_trait]
impl FileStorage for StubFileStorage {
    async fn ensure_uploaded(&self, path: &str) -> Result<(), AppError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.uploaded.lock().contains(path) {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Uploaded file '{}' does not exist",
                path
            )))
        }
    }

    async fn promote(&self, path: &str) -> Result<String, AppError> {
        self.promoted.lock().push(path.to_string());
        Ok(format!("posts/{}", path))
    }
}

pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            protocol: "http".into(),
            host: "localhost".into(),
            port: 3000,
        },
        database: DatabaseSettings {
            url: "postgres://localhost/crud_core_test".into(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: 1,
        },
        pagination: PaginationSettings::default(),
        storage: StorageSettings {
            temp_dir: "public/temp".into(),
            public_dir: "public".into(),
        },
        environment: "test".into(),
    }
}

/// Application state over a fresh in-memory backend.
pub struct TestApp {
    pub state: AppState<MemoryBackend>,
    pub backend: Arc<MemoryBackend>,
    pub files: Arc<StubFileStorage>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_files(StubFileStorage::default())
    }

    pub fn with_files(files: StubFileStorage) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let files = Arc::new(files);
        let state = AppState::new(
            Arc::clone(&backend),
            Arc::clone(&files) as Arc<dyn FileStorage>,
            &test_settings(),
        )
        .expect("test settings are valid");
        Self {
            state,
            backend,
            files,
        }
    }

    pub async fn create_user(&self, nickname: &str) -> User {
        self.state
            .users
            .create_user(CreateUserRequest {
                nickname: nickname.into(),
                email: format!("{}@example.com", nickname),
                role: None,
            })
            .await
            .expect("user is created")
    }

    /// Create `count` posts without images and return their ids.
    pub async fn seed_posts(&self, count: usize) -> Vec<i64> {
        let author = caller(1);
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let detail = self
                .state
                .posts
                .create_post(author, post_request(&[]))
                .await
                .expect("post is created");
            ids.push(detail.post.id);
        }
        ids
    }
}

pub fn caller(id: i64) -> Caller {
    Caller::new(id, Role::User)
}

pub fn post_request(images: &[&str]) -> CreatePostRequest {
    let title: String = Sentence(2..6).fake();
    CreatePostRequest {
        title: title.chars().take(100).collect(),
        content: Paragraph(1..3).fake(),
        images: images.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn comment_text() -> String {
    Sentence(3..8).fake()
}
