//! Chat room and membership entities.
//!
//! Maps to the `chats` and `chat_members` tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, NewEntity};
use crate::domain::value_objects::{Column, FieldType, Record, Schema, Value};
use crate::shared::error::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub static CHAT_SCHEMA: Schema = Schema {
    table: "chats",
    columns: &[
        Column::generated("id", "id", FieldType::Integer),
        Column::generated("createdAt", "created_at", FieldType::Timestamp),
        Column::generated("updatedAt", "updated_at", FieldType::Timestamp),
    ],
};

impl Entity for Chat {
    fn schema() -> &'static Schema {
        &CHAT_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn from_record(record: &Record) -> Result<Self, StorageError> {
        Ok(Self {
            id: record.int("id")?,
            created_at: record.timestamp("createdAt")?,
            updated_at: record.timestamp("updatedAt")?,
        })
    }
}

/// A chat room has no columns of its own beyond the generated ones.
#[derive(Debug, Clone, Default)]
pub struct NewChat;

impl NewEntity for NewChat {
    type Entity = Chat;

    fn into_values(self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }
}

/// A user's participation in a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMember {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

pub static CHAT_MEMBER_SCHEMA: Schema = Schema {
    table: "chat_members",
    columns: &[
        Column::generated("id", "id", FieldType::Integer),
        Column::new("chatId", "chat_id", FieldType::Integer),
        Column::new("userId", "user_id", FieldType::Integer),
        Column::generated("createdAt", "created_at", FieldType::Timestamp),
    ],
};

impl ChatMember {
    pub const CHAT_ID: &'static str = "chatId";
    pub const USER_ID: &'static str = "userId";
}

impl Entity for ChatMember {
    fn schema() -> &'static Schema {
        &CHAT_MEMBER_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn from_record(record: &Record) -> Result<Self, StorageError> {
        Ok(Self {
            id: record.int("id")?,
            chat_id: record.int("chatId")?,
            user_id: record.int("userId")?,
            created_at: record.timestamp("createdAt")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewChatMember {
    pub chat_id: i64,
    pub user_id: i64,
}

impl NewEntity for NewChatMember {
    type Entity = ChatMember;

    fn into_values(self) -> Vec<(&'static str, Value)> {
        vec![
            ("chatId", self.chat_id.into()),
            ("userId", self.user_id.into()),
        ]
    }
}
