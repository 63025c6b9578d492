//! Application Startup
//!
//! Composition root: wires a storage backend, the transaction scope, the
//! query composer and the domain services together.

use std::sync::Arc;

use anyhow::Result;
use config::ConfigError;

use crate::application::services::{
    ChatService, CommentService, ImageService, PaginationService, PostService, UserService,
};
use crate::config::Settings;
use crate::domain::query::{FilterParser, QueryComposer};
use crate::domain::services::FileStorage;
use crate::infrastructure::database::{self, Backend, PgBackend, TransactionScope};
use crate::infrastructure::repositories::EntityRepository;
use crate::infrastructure::storage::LocalFileStorage;

/// Services shared by every caller, generic over the storage backend.
pub struct AppState<B: Backend> {
    pub backend: Arc<B>,
    pub scope: TransactionScope<B>,
    pub composer: Arc<QueryComposer>,
    pub pagination: Arc<PaginationService>,
    pub posts: PostService<B>,
    pub comments: CommentService<B>,
    pub users: UserService<B>,
    pub chats: ChatService<B>,
}

impl<B: Backend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            scope: self.scope.clone(),
            composer: Arc::clone(&self.composer),
            pagination: Arc::clone(&self.pagination),
            posts: self.posts.clone(),
            comments: self.comments.clone(),
            users: self.users.clone(),
            chats: self.chats.clone(),
        }
    }
}

impl<B: Backend> AppState<B> {
    /// Build every service on top of `backend`.
    ///
    /// # Errors
    ///
    /// Fails when the server address cannot form a base URL.
    pub fn new(
        backend: Arc<B>,
        files: Arc<dyn FileStorage>,
        settings: &Settings,
    ) -> Result<Self, ConfigError> {
        let scope = TransactionScope::new(Arc::clone(&backend));
        let composer = Arc::new(QueryComposer::new(
            FilterParser::default(),
            settings.pagination.default_take,
            settings.pagination.max_take,
        ));
        let pagination = Arc::new(PaginationService::new(settings.server.base_url()?));

        let images = ImageService::new(EntityRepository::new(Arc::clone(&backend)), files);
        let posts = PostService::new(
            EntityRepository::new(Arc::clone(&backend)),
            EntityRepository::new(Arc::clone(&backend)),
            EntityRepository::new(Arc::clone(&backend)),
            images,
            scope.clone(),
            Arc::clone(&composer),
            Arc::clone(&pagination),
        );
        let comments = CommentService::new(
            EntityRepository::new(Arc::clone(&backend)),
            posts.clone(),
            scope.clone(),
            Arc::clone(&composer),
            Arc::clone(&pagination),
        );
        let users = UserService::new(
            EntityRepository::new(Arc::clone(&backend)),
            EntityRepository::new(Arc::clone(&backend)),
            scope.clone(),
            Arc::clone(&composer),
            Arc::clone(&pagination),
        );
        let chats = ChatService::new(
            EntityRepository::new(Arc::clone(&backend)),
            EntityRepository::new(Arc::clone(&backend)),
            EntityRepository::new(Arc::clone(&backend)),
            scope.clone(),
            Arc::clone(&composer),
            Arc::clone(&pagination),
        );

        Ok(Self {
            backend,
            scope,
            composer,
            pagination,
            posts,
            comments,
            users,
            chats,
        })
    }
}

/// Connect to PostgreSQL, apply migrations and build the state.
pub async fn connect_postgres(settings: &Settings) -> Result<AppState<PgBackend>> {
    let pool = database::create_pool(&settings.database).await?;
    tracing::info!("Database connection pool created");

    database::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let files = Arc::new(LocalFileStorage::from_settings(&settings.storage));
    let state = AppState::new(Arc::new(PgBackend::new(pool)), files, settings)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DatabaseSettings, PaginationSettings, ServerSettings, StorageSettings,
    };
    use crate::domain::services::MockFileStorage;
    use crate::infrastructure::database::MemoryBackend;

    fn settings(host: &str) -> Settings {
        Settings {
            server: ServerSettings {
                protocol: "http".into(),
                host: host.into(),
                port: 8080,
            },
            database: DatabaseSettings {
                url: "postgres://localhost/crud".into(),
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

    #[test]
    fn test_state_uses_server_base_url() {
        let state = AppState::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(MockFileStorage::new()),
            &settings("api.example.com"),
        )
        .unwrap();
        assert_eq!(
            state.pagination.base_url().as_str(),
            "http://api.example.com:8080/"
        );
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let result = AppState::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(MockFileStorage::new()),
            &settings("bad host"),
        );
        assert!(result.is_err());
    }
}
