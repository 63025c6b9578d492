//! Image entity.
//!
//! Maps to the `images` table. Only the relative file reference is stored;
//! the bytes live with the file storage collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, NewEntity};
use crate::domain::value_objects::{Column, FieldType, Record, Schema, Value};
use crate::shared::error::StorageError;

/// What the image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    #[default]
    PostImage,
}

impl ImageKind {
    /// Unknown kinds fall back to a post image, the only kind stored today.
    pub fn from_str(_s: &str) -> Self {
        Self::PostImage
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostImage => "post_image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: i64,
    pub post_id: i64,
    /// Position of the image within its post.
    pub order: i64,
    #[serde(rename = "type")]
    pub kind: ImageKind,
    /// File name relative to the public posts folder.
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub static IMAGE_SCHEMA: Schema = Schema {
    table: "images",
    columns: &[
        Column::generated("id", "id", FieldType::Integer),
        Column::new("postId", "post_id", FieldType::Integer),
        Column::new("order", "sort_order", FieldType::Integer),
        Column::new("type", "kind", FieldType::Text),
        Column::new("path", "path", FieldType::Text),
        Column::generated("createdAt", "created_at", FieldType::Timestamp),
        Column::generated("updatedAt", "updated_at", FieldType::Timestamp),
    ],
};

impl Image {
    pub const POST_ID: &'static str = "postId";
    pub const ORDER: &'static str = "order";
}

impl Entity for Image {
    fn schema() -> &'static Schema {
        &IMAGE_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn from_record(record: &Record) -> Result<Self, StorageError> {
        Ok(Self {
            id: record.int("id")?,
            post_id: record.int("postId")?,
            order: record.int("order")?,
            kind: ImageKind::from_str(&record.text("type")?),
            path: record.text("path")?,
            created_at: record.timestamp("createdAt")?,
            updated_at: record.timestamp("updatedAt")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub post_id: i64,
    pub order: i64,
    pub kind: ImageKind,
    pub path: String,
}

impl NewEntity for NewImage {
    type Entity = Image;

    fn into_values(self) -> Vec<(&'static str, Value)> {
        vec![
            ("postId", self.post_id.into()),
            ("order", self.order.into()),
            ("type", self.kind.as_str().into()),
            ("path", self.path.into()),
        ]
    }
}
