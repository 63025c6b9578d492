//! Image Service
//!
//! Attaches uploaded images to posts.

use std::sync::Arc;

use crate::domain::query::{Direction, FindOptions, OrderSpec, Predicate};
use crate::domain::services::FileStorage;
use crate::domain::value_objects::ID_FIELD;
use crate::domain::{Image, ImageKind, NewImage};
use crate::infrastructure::database::{Backend, TransactionHandle};
use crate::infrastructure::repositories::EntityRepository;
use crate::shared::error::AppError;

pub struct ImageService<B: Backend> {
    images: EntityRepository<Image, B>,
    files: Arc<dyn FileStorage>,
}

impl<B: Backend> Clone for ImageService<B> {
    fn clone(&self) -> Self {
        Self {
            images: self.images.clone(),
            files: Arc::clone(&self.files),
        }
    }
}

impl<B: Backend> ImageService<B> {
    pub fn new(images: EntityRepository<Image, B>, files: Arc<dyn FileStorage>) -> Self {
        Self { images, files }
    }

    /// Attach one uploaded file to a post, inside the caller's transaction.
    ///
    /// The upload must exist in the temporary folder. The row is written
    /// before the file is promoted, so a failed save never moves a file.
    pub async fn create_post_image(
        &self,
        tx: &mut TransactionHandle<B>,
        post_id: i64,
        path: String,
        order: i64,
    ) -> Result<Image, AppError> {
        self.files.ensure_uploaded(&path).await?;

        let image = self
            .images
            .save(
                Some(tx),
                NewImage {
                    post_id,
                    order,
                    kind: ImageKind::PostImage,
                    path: path.clone(),
                },
            )
            .await?;

        let public_path = self.files.promote(&path).await?;
        tracing::debug!(post_id, image_id = image.id, order, %public_path, "Image attached");
        Ok(image)
    }

    /// Images of the given posts, each post's images in display order.
    pub async fn images_of(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        post_ids: &[i64],
    ) -> Result<Vec<Image>, AppError> {
        let options = FindOptions::new()
            .filter(Predicate::one_of(Image::POST_ID, post_ids.iter().copied()))
            .order_by(OrderSpec::new(Image::ORDER, Direction::Asc))
            .order_by(OrderSpec::new(ID_FIELD, Direction::Asc));
        Ok(self.images.find(tx, &options).await?)
    }

    /// Remove every image row of a post.
    pub async fn delete_post_images(
        &self,
        tx: &mut TransactionHandle<B>,
        post_id: i64,
    ) -> Result<u64, AppError> {
        Ok(self
            .images
            .delete(Some(tx), &[Predicate::equal(Image::POST_ID, post_id)])
            .await?)
    }
}
