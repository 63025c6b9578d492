//! User entity.
//!
//! Maps to the `users` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, NewEntity};
use crate::domain::value_objects::{Column, FieldType, Record, Schema, Value};
use crate::shared::error::StorageError;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

/// Identity of an already-authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
}

impl Caller {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub nickname: String,
    pub email: String,
    pub role: Role,
    /// Confirmed followers of this user.
    pub follower_count: i64,
    /// Confirmed users this user follows.
    pub followee_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub static USER_SCHEMA: Schema = Schema {
    table: "users",
    columns: &[
        Column::generated("id", "id", FieldType::Integer),
        Column::new("nickname", "nickname", FieldType::Text),
        Column::new("email", "email", FieldType::Text),
        Column::new("role", "role", FieldType::Text),
        Column::new("followerCount", "follower_count", FieldType::Integer),
        Column::new("followeeCount", "followee_count", FieldType::Integer),
        Column::generated("createdAt", "created_at", FieldType::Timestamp),
        Column::generated("updatedAt", "updated_at", FieldType::Timestamp),
    ],
};

impl User {
    pub const FOLLOWER_COUNT: &'static str = "followerCount";
    pub const FOLLOWEE_COUNT: &'static str = "followeeCount";
}

impl Entity for User {
    fn schema() -> &'static Schema {
        &USER_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn from_record(record: &Record) -> Result<Self, StorageError> {
        Ok(Self {
            id: record.int("id")?,
            nickname: record.text("nickname")?,
            email: record.text("email")?,
            role: Role::from_str(&record.text("role")?),
            follower_count: record.int("followerCount")?,
            followee_count: record.int("followeeCount")?,
            created_at: record.timestamp("createdAt")?,
            updated_at: record.timestamp("updatedAt")?,
        })
    }
}

/// A user about to be created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nickname: String,
    pub email: String,
    pub role: Role,
}

impl NewEntity for NewUser {
    type Entity = User;

    fn into_values(self) -> Vec<(&'static str, Value)> {
        vec![
            ("nickname", self.nickname.into()),
            ("email", self.email.into()),
            ("role", self.role.as_str().into()),
            ("followerCount", Value::Int(0)),
            ("followeeCount", Value::Int(0)),
        ]
    }
}
