//! Post entity.
//!
//! Maps to the `posts` table:
//! - id: BIGSERIAL PRIMARY KEY
//! - author_id: BIGINT NOT NULL REFERENCES users(id)
//! - title, content: TEXT NOT NULL
//! - like_count, comment_count: BIGINT NOT NULL DEFAULT 0
//! - created_at, updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
//!
//! `comment_count` is derived: it only changes through atomic increments
//! issued in the same transaction as the comment write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, NewEntity};
use crate::domain::value_objects::{Column, FieldType, Record, Schema, Value};
use crate::shared::error::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub static POST_SCHEMA: Schema = Schema {
    table: "posts",
    columns: &[
        Column::generated("id", "id", FieldType::Integer),
        Column::new("authorId", "author_id", FieldType::Integer),
        Column::new("title", "title", FieldType::Text),
        Column::new("content", "content", FieldType::Text),
        Column::new("likeCount", "like_count", FieldType::Integer),
        Column::new("commentCount", "comment_count", FieldType::Integer),
        Column::generated("createdAt", "created_at", FieldType::Timestamp),
        Column::generated("updatedAt", "updated_at", FieldType::Timestamp),
    ],
};

impl Post {
    pub const COMMENT_COUNT: &'static str = "commentCount";
    pub const LIKE_COUNT: &'static str = "likeCount";
}

impl Entity for Post {
    fn schema() -> &'static Schema {
        &POST_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn from_record(record: &Record) -> Result<Self, StorageError> {
        Ok(Self {
            id: record.int("id")?,
            author_id: record.int("authorId")?,
            title: record.text("title")?,
            content: record.text("content")?,
            like_count: record.int("likeCount")?,
            comment_count: record.int("commentCount")?,
            created_at: record.timestamp("createdAt")?,
            updated_at: record.timestamp("updatedAt")?,
        })
    }
}

/// A post about to be created. Counters always start at zero.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub content: String,
}

impl NewEntity for NewPost {
    type Entity = Post;

    fn into_values(self) -> Vec<(&'static str, Value)> {
        vec![
            ("authorId", self.author_id.into()),
            ("title", self.title.into()),
            ("content", self.content.into()),
            ("likeCount", Value::Int(0)),
            ("commentCount", Value::Int(0)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_from_record() {
        let now = Utc::now();
        let mut record = Record::new();
        for (field, value) in (NewPost {
            author_id: 1,
            title: "hello".into(),
            content: "world".into(),
        })
        .into_values()
        {
            record.insert(field, value);
        }
        record.insert("id", Value::Int(9));
        record.insert("createdAt", Value::Timestamp(now));
        record.insert("updatedAt", Value::Timestamp(now));

        let post = Post::from_record(&record).unwrap();
        assert_eq!(post.id, 9);
        assert_eq!(post.comment_count, 0);
        assert_eq!(post.title, "hello");
    }

    #[test]
    fn test_missing_column_fails_to_decode() {
        let mut record = Record::new();
        record.insert("id", Value::Int(1));
        assert!(matches!(Post::from_record(&record), Err(StorageError::Decode(_))));
    }
}
