//! Post Service
//!
//! Post reads, and the write orchestrators that keep images, comments and
//! the `commentCount` counter consistent with their post.
//!
//! Every read returns posts with their author and images attached. Listings
//! load those relations with one query each per page.

use std::collections::HashMap;
use std::sync::Arc;

use super::image_service::ImageService;
use super::pagination_service::PaginationService;
use crate::application::dto::{CreatePostRequest, Page, PostDetail, UpdatePostRequest};
use crate::domain::query::{FindOptions, Predicate, QueryComposer};
use crate::domain::value_objects::{Value, ID_FIELD};
use crate::domain::{Caller, Comment, Image, NewPost, Post, User, POST_SCHEMA};
use crate::infrastructure::database::{Backend, TransactionHandle, TransactionScope};
use crate::infrastructure::repositories::EntityRepository;
use crate::shared::error::AppError;
use crate::shared::validation::validate;

pub struct PostService<B: Backend> {
    posts: EntityRepository<Post, B>,
    comments: EntityRepository<Comment, B>,
    users: EntityRepository<User, B>,
    images: ImageService<B>,
    scope: TransactionScope<B>,
    composer: Arc<QueryComposer>,
    pagination: Arc<PaginationService>,
}

impl<B: Backend> Clone for PostService<B> {
    fn clone(&self) -> Self {
        Self {
            posts: self.posts.clone(),
            comments: self.comments.clone(),
            users: self.users.clone(),
            images: self.images.clone(),
            scope: self.scope.clone(),
            composer: Arc::clone(&self.composer),
            pagination: Arc::clone(&self.pagination),
        }
    }
}

impl<B: Backend> PostService<B> {
    pub fn new(
        posts: EntityRepository<Post, B>,
        comments: EntityRepository<Comment, B>,
        users: EntityRepository<User, B>,
        images: ImageService<B>,
        scope: TransactionScope<B>,
        composer: Arc<QueryComposer>,
        pagination: Arc<PaginationService>,
    ) -> Self {
        Self {
            posts,
            comments,
            users,
            images,
            scope,
            composer,
            pagination,
        }
    }

    /// List posts with the `where__` / `order__` DSL.
    pub async fn paginate_posts<I, K, V>(&self, params: I) -> Result<Page<PostDetail>, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let spec = self.composer.compose(&POST_SCHEMA, params)?;
        let page = self
            .pagination
            .paginate(&self.posts, &spec, Vec::new(), "posts")
            .await?;
        let details = self.details(None, page.data().to_vec()).await?;
        Ok(page.with_data(details))
    }

    /// A post with its author and images.
    pub async fn get_post(&self, id: i64) -> Result<PostDetail, AppError> {
        let post = self
            .posts
            .find_by_id(None, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;
        let mut details = self.details(None, vec![post]).await?;
        details
            .pop()
            .ok_or_else(|| AppError::Internal(format!("Post {} lost its details", id)))
    }

    /// Attach authors and images, keeping the order of `posts`.
    async fn details(
        &self,
        mut tx: Option<&mut TransactionHandle<B>>,
        posts: Vec<Post>,
    ) -> Result<Vec<PostDetail>, AppError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let mut author_ids: Vec<i64> = posts.iter().map(|p| p.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let mut images: HashMap<i64, Vec<Image>> = HashMap::new();
        for image in self.images.images_of(tx.as_deref_mut(), &post_ids).await? {
            images.entry(image.post_id).or_default().push(image);
        }
        let authors: HashMap<i64, User> = self
            .users
            .find(
                tx,
                &FindOptions::new().filter(Predicate::one_of(ID_FIELD, author_ids)),
            )
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        Ok(posts
            .into_iter()
            .map(|post| PostDetail {
                author: authors.get(&post.author_id).cloned(),
                images: images.remove(&post.id).unwrap_or_default(),
                post,
            })
            .collect())
    }

    pub async fn post_exists(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        id: i64,
    ) -> Result<bool, AppError> {
        Ok(self
            .posts
            .exists(tx, &[Predicate::equal(ID_FIELD, id)])
            .await?)
    }

    /// Create a post and attach its images atomically.
    pub async fn create_post(
        &self,
        caller: Caller,
        request: CreatePostRequest,
    ) -> Result<PostDetail, AppError> {
        validate(&request)?;
        let this = self.clone();

        let detail = self
            .scope
            .with_transaction(move |tx| {
                Box::pin(async move { this.create_post_in(tx, caller.id, request).await })
            })
            .await?;

        tracing::info!(
            post_id = detail.post.id,
            images = detail.images.len(),
            "Post created"
        );
        Ok(detail)
    }

    /// Post first, then each image in request order, all on `tx`.
    pub async fn create_post_in(
        &self,
        tx: &mut TransactionHandle<B>,
        author_id: i64,
        request: CreatePostRequest,
    ) -> Result<PostDetail, AppError> {
        let post = self
            .posts
            .save(
                Some(&mut *tx),
                NewPost {
                    author_id,
                    title: request.title,
                    content: request.content,
                },
            )
            .await?;

        let mut images = Vec::with_capacity(request.images.len());
        for (order, path) in request.images.into_iter().enumerate() {
            let image = self
                .images
                .create_post_image(&mut *tx, post.id, path, order as i64)
                .await?;
            images.push(image);
        }

        let author = self.users.find_by_id(Some(&mut *tx), author_id).await?;
        Ok(PostDetail {
            post,
            author,
            images,
        })
    }

    pub async fn update_post(&self, id: i64, request: UpdatePostRequest) -> Result<Post, AppError> {
        validate(&request)?;

        let mut changes: Vec<(&'static str, Value)> = Vec::new();
        if let Some(title) = request.title {
            changes.push(("title", title.into()));
        }
        if let Some(content) = request.content {
            changes.push(("content", content.into()));
        }

        self.posts
            .update(None, id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    /// Delete a post with its images and comments.
    pub async fn delete_post(&self, id: i64) -> Result<(), AppError> {
        let this = self.clone();

        self.scope
            .with_transaction(move |tx| {
                Box::pin(async move {
                    if !this.post_exists(Some(&mut *tx), id).await? {
                        return Err(AppError::NotFound(format!("Post {} not found", id)));
                    }
                    this.images.delete_post_images(&mut *tx, id).await?;
                    this.comments
                        .delete(Some(&mut *tx), &[Predicate::equal(Comment::POST_ID, id)])
                        .await?;
                    this.posts.delete_by_id(Some(&mut *tx), id).await?;
                    Ok(())
                })
            })
            .await?;

        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }

    pub async fn increment_comment_count(
        &self,
        tx: &mut TransactionHandle<B>,
        post_id: i64,
    ) -> Result<(), AppError> {
        Ok(self
            .posts
            .increment(Some(tx), post_id, Post::COMMENT_COUNT, 1)
            .await?)
    }

    pub async fn decrement_comment_count(
        &self,
        tx: &mut TransactionHandle<B>,
        post_id: i64,
    ) -> Result<(), AppError> {
        Ok(self
            .posts
            .increment(Some(tx), post_id, Post::COMMENT_COUNT, -1)
            .await?)
    }
}
