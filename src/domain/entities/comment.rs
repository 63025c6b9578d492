//! Comment entity.
//!
//! Maps to the `comments` table. Every live comment is counted in its post's
//! `commentCount`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, NewEntity};
use crate::domain::value_objects::{Column, FieldType, Record, Schema, Value};
use crate::shared::error::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub comment: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub static COMMENT_SCHEMA: Schema = Schema {
    table: "comments",
    columns: &[
        Column::generated("id", "id", FieldType::Integer),
        Column::new("postId", "post_id", FieldType::Integer),
        Column::new("authorId", "author_id", FieldType::Integer),
        Column::new("comment", "comment", FieldType::Text),
        Column::new("likeCount", "like_count", FieldType::Integer),
        Column::generated("createdAt", "created_at", FieldType::Timestamp),
        Column::generated("updatedAt", "updated_at", FieldType::Timestamp),
    ],
};

impl Comment {
    pub const POST_ID: &'static str = "postId";
}

impl Entity for Comment {
    fn schema() -> &'static Schema {
        &COMMENT_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn from_record(record: &Record) -> Result<Self, StorageError> {
        Ok(Self {
            id: record.int("id")?,
            post_id: record.int("postId")?,
            author_id: record.int("authorId")?,
            comment: record.text("comment")?,
            like_count: record.int("likeCount")?,
            created_at: record.timestamp("createdAt")?,
            updated_at: record.timestamp("updatedAt")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub comment: String,
}

impl NewEntity for NewComment {
    type Entity = Comment;

    fn into_values(self) -> Vec<(&'static str, Value)> {
        vec![
            ("postId", self.post_id.into()),
            ("authorId", self.author_id.into()),
            ("comment", self.comment.into()),
            ("likeCount", Value::Int(0)),
        ]
    }
}
