//! Comment Service
//!
//! Comment reads and writes. Creating or deleting a comment adjusts the
//! parent post's `commentCount` in the same transaction.

use std::sync::Arc;

use super::pagination_service::PaginationService;
use super::post_service::PostService;
use crate::application::dto::{CreateCommentRequest, Page, UpdateCommentRequest};
use crate::domain::query::{Predicate, QueryComposer};
use crate::domain::value_objects::ID_FIELD;
use crate::domain::{Caller, Comment, NewComment, COMMENT_SCHEMA};
use crate::infrastructure::database::{Backend, TransactionScope};
use crate::infrastructure::repositories::EntityRepository;
use crate::shared::error::AppError;
use crate::shared::validation::validate;

pub struct CommentService<B: Backend> {
    comments: EntityRepository<Comment, B>,
    posts: PostService<B>,
    scope: TransactionScope<B>,
    composer: Arc<QueryComposer>,
    pagination: Arc<PaginationService>,
}

impl<B: Backend> Clone for CommentService<B> {
    fn clone(&self) -> Self {
        Self {
            comments: self.comments.clone(),
            posts: self.posts.clone(),
            scope: self.scope.clone(),
            composer: Arc::clone(&self.composer),
            pagination: Arc::clone(&self.pagination),
        }
    }
}

fn comment_of(post_id: i64, id: i64) -> Vec<Predicate> {
    vec![
        Predicate::equal(Comment::POST_ID, post_id),
        Predicate::equal(ID_FIELD, id),
    ]
}

fn comment_not_found(post_id: i64, id: i64) -> AppError {
    AppError::NotFound(format!("Comment {} not found on post {}", id, post_id))
}

impl<B: Backend> CommentService<B> {
    pub fn new(
        comments: EntityRepository<Comment, B>,
        posts: PostService<B>,
        scope: TransactionScope<B>,
        composer: Arc<QueryComposer>,
        pagination: Arc<PaginationService>,
    ) -> Self {
        Self {
            comments,
            posts,
            scope,
            composer,
            pagination,
        }
    }

    /// List the comments of one post.
    pub async fn paginate_comments<I, K, V>(
        &self,
        post_id: i64,
        params: I,
    ) -> Result<Page<Comment>, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let spec = self.composer.compose(&COMMENT_SCHEMA, params)?;
        if !self.posts.post_exists(None, post_id).await? {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }
        self.pagination
            .paginate(
                &self.comments,
                &spec,
                vec![Predicate::equal(Comment::POST_ID, post_id)],
                &format!("posts/{}/comments", post_id),
            )
            .await
    }

    pub async fn get_comment(&self, post_id: i64, id: i64) -> Result<Comment, AppError> {
        self.comments
            .find_one(None, comment_of(post_id, id))
            .await?
            .ok_or_else(|| comment_not_found(post_id, id))
    }

    /// Save a comment and bump the post's counter atomically.
    pub async fn create_comment(
        &self,
        caller: Caller,
        post_id: i64,
        request: CreateCommentRequest,
    ) -> Result<Comment, AppError> {
        validate(&request)?;
        let this = self.clone();

        let comment = self
            .scope
            .with_transaction(move |tx| {
                Box::pin(async move {
                    if !this.posts.post_exists(Some(&mut *tx), post_id).await? {
                        return Err(AppError::NotFound(format!("Post {} not found", post_id)));
                    }
                    let comment = this
                        .comments
                        .save(
                            Some(&mut *tx),
                            NewComment {
                                post_id,
                                author_id: caller.id,
                                comment: request.comment,
                            },
                        )
                        .await?;
                    this.posts.increment_comment_count(&mut *tx, post_id).await?;
                    Ok(comment)
                })
            })
            .await?;

        tracing::info!(post_id, comment_id = comment.id, "Comment created");
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        post_id: i64,
        id: i64,
        request: UpdateCommentRequest,
    ) -> Result<Comment, AppError> {
        validate(&request)?;
        let existing = self.get_comment(post_id, id).await?;

        let changes = match request.comment {
            Some(comment) => vec![("comment", comment.into())],
            None => return Ok(existing),
        };
        self.comments
            .update(None, id, changes)
            .await?
            .ok_or_else(|| comment_not_found(post_id, id))
    }

    /// Delete a comment and lower the post's counter atomically.
    pub async fn delete_comment(&self, post_id: i64, id: i64) -> Result<(), AppError> {
        let this = self.clone();

        self.scope
            .with_transaction(move |tx| {
                Box::pin(async move {
                    let removed = this
                        .comments
                        .delete(Some(&mut *tx), &comment_of(post_id, id))
                        .await?;
                    if removed == 0 {
                        return Err(comment_not_found(post_id, id));
                    }
                    this.posts.decrement_comment_count(&mut *tx, post_id).await?;
                    Ok(())
                })
            })
            .await?;

        tracing::info!(post_id, comment_id = id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::ImageService;
    use crate::domain::services::MockFileStorage;
    use crate::domain::{NewPost, Role};
    use crate::infrastructure::database::MemoryBackend;
    use url::Url;

    struct Fixture {
        backend: Arc<MemoryBackend>,
        posts: PostService<MemoryBackend>,
        comments: CommentService<MemoryBackend>,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        let scope = TransactionScope::new(Arc::clone(&backend));
        let composer = Arc::new(QueryComposer::default());
        let pagination = Arc::new(PaginationService::new(
            Url::parse("http://localhost:3000/").unwrap(),
        ));
        let posts = PostService::new(
            EntityRepository::new(Arc::clone(&backend)),
            EntityRepository::new(Arc::clone(&backend)),
            EntityRepository::new(Arc::clone(&backend)),
            ImageService::new(
                EntityRepository::new(Arc::clone(&backend)),
                Arc::new(MockFileStorage::new()),
            ),
            scope.clone(),
            Arc::clone(&composer),
            Arc::clone(&pagination),
        );
        let comments = CommentService::new(
            EntityRepository::new(Arc::clone(&backend)),
            posts.clone(),
            scope,
            composer,
            pagination,
        );
        Fixture {
            backend,
            posts,
            comments,
        }
    }

    async fn seed_post(backend: &Arc<MemoryBackend>) -> i64 {
        EntityRepository::<crate::domain::Post, _>::new(Arc::clone(backend))
            .save(
                None,
                NewPost {
                    author_id: 1,
                    title: "t".into(),
                    content: "c".into(),
                },
            )
            .await
            .unwrap()
            .id
    }

    fn caller() -> Caller {
        Caller::new(3, Role::User)
    }

    fn body(text: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            comment: text.into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_delete_keep_counter() {
        let f = fixture();
        let post_id = seed_post(&f.backend).await;

        let first = f.comments.create_comment(caller(), post_id, body("one")).await.unwrap();
        f.comments.create_comment(caller(), post_id, body("two")).await.unwrap();
        assert_eq!(f.posts.get_post(post_id).await.unwrap().post.comment_count, 2);

        f.comments.delete_comment(post_id, first.id).await.unwrap();
        assert_eq!(f.posts.get_post(post_id).await.unwrap().post.comment_count, 1);
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_rolls_back() {
        let f = fixture();
        let err = f
            .comments
            .create_comment(caller(), 99, body("orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err.root_cause(), AppError::NotFound(_)));
        assert_eq!(f.backend.stats().rolled_back, 1);
        assert_eq!(f.backend.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_comment_leaves_counter() {
        let f = fixture();
        let post_id = seed_post(&f.backend).await;
        f.comments.create_comment(caller(), post_id, body("one")).await.unwrap();

        let err = f.comments.delete_comment(post_id, 42).await.unwrap_err();
        assert!(matches!(err.root_cause(), AppError::NotFound(_)));
        assert_eq!(f.posts.get_post(post_id).await.unwrap().post.comment_count, 1);
    }

    #[tokio::test]
    async fn test_paginate_is_scoped_to_post() {
        let f = fixture();
        let first = seed_post(&f.backend).await;
        let second = seed_post(&f.backend).await;
        for text in ["a", "b", "c"] {
            f.comments.create_comment(caller(), first, body(text)).await.unwrap();
        }
        f.comments.create_comment(caller(), second, body("x")).await.unwrap();

        let page = f
            .comments
            .paginate_comments(first, [("take", "2")])
            .await
            .unwrap();
        let page = page.as_cursor().unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost:3000/posts/1/comments?take=2&where__id__more_than=2")
        );

        assert!(matches!(
            f.comments.paginate_comments(77, Vec::<(String, String)>::new()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_comment() {
        let f = fixture();
        let post_id = seed_post(&f.backend).await;
        let created = f.comments.create_comment(caller(), post_id, body("old")).await.unwrap();

        let updated = f
            .comments
            .update_comment(
                post_id,
                created.id,
                UpdateCommentRequest {
                    comment: Some("new".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.comment, "new");
        assert!(matches!(
            f.comments.get_comment(post_id + 1, created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
