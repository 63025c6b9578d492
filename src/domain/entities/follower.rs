//! Follow relation between two users.
//!
//! Maps to the `user_followers` table. A follow starts unconfirmed; only
//! confirmed follows count towards the users' counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, NewEntity};
use crate::domain::value_objects::{Column, FieldType, Record, Schema, Value};
use crate::shared::error::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFollower {
    pub id: i64,
    pub follower_id: i64,
    pub followee_id: i64,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub static USER_FOLLOWER_SCHEMA: Schema = Schema {
    table: "user_followers",
    columns: &[
        Column::generated("id", "id", FieldType::Integer),
        Column::new("followerId", "follower_id", FieldType::Integer),
        Column::new("followeeId", "followee_id", FieldType::Integer),
        Column::new("isConfirmed", "is_confirmed", FieldType::Boolean),
        Column::generated("createdAt", "created_at", FieldType::Timestamp),
        Column::generated("updatedAt", "updated_at", FieldType::Timestamp),
    ],
};

impl UserFollower {
    pub const FOLLOWER_ID: &'static str = "followerId";
    pub const FOLLOWEE_ID: &'static str = "followeeId";
    pub const IS_CONFIRMED: &'static str = "isConfirmed";
}

impl Entity for UserFollower {
    fn schema() -> &'static Schema {
        &USER_FOLLOWER_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn from_record(record: &Record) -> Result<Self, StorageError> {
        Ok(Self {
            id: record.int("id")?,
            follower_id: record.int("followerId")?,
            followee_id: record.int("followeeId")?,
            is_confirmed: record.boolean("isConfirmed")?,
            created_at: record.timestamp("createdAt")?,
            updated_at: record.timestamp("updatedAt")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUserFollower {
    pub follower_id: i64,
    pub followee_id: i64,
}

impl NewEntity for NewUserFollower {
    type Entity = UserFollower;

    fn into_values(self) -> Vec<(&'static str, Value)> {
        vec![
            ("followerId", self.follower_id.into()),
            ("followeeId", self.followee_id.into()),
            ("isConfirmed", false.into()),
        ]
    }
}
