//! # Domain Entities
//!
//! Core domain entities and the static schemas that expose their fields to
//! the query DSL. Every entity maps to one table and carries an increasing
//! `id` plus `createdAt`.
//!
//! ## Core Entities
//!
//! - **User**: account with derived follower/followee counters
//! - **Post**: a post with derived `likeCount` / `commentCount`
//! - **Comment**: a comment on a post
//! - **Image**: an image reference attached to a post
//!
//! ## Supporting Entities
//!
//! - **UserFollower**: follow request between two users
//! - **Chat / ChatMember**: chat rooms and their participants
//!
//! Persistence goes through the generic entity repository in the
//! infrastructure layer; entities only describe how a [`Record`] becomes a
//! typed value and how new rows are written.

mod chat;
mod comment;
mod follower;
mod image;
mod post;
mod user;

use crate::domain::value_objects::{Record, Schema, Value};
use crate::shared::error::StorageError;

pub use chat::{Chat, ChatMember, NewChat, NewChatMember, CHAT_MEMBER_SCHEMA, CHAT_SCHEMA};
pub use comment::{Comment, NewComment, COMMENT_SCHEMA};
pub use follower::{NewUserFollower, UserFollower, USER_FOLLOWER_SCHEMA};
pub use image::{Image, ImageKind, NewImage, IMAGE_SCHEMA};
pub use post::{NewPost, Post, POST_SCHEMA};
pub use user::{Caller, NewUser, Role, User, USER_SCHEMA};

/// A persisted entity.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Static schema of the backing table.
    fn schema() -> &'static Schema;

    /// Identity value.
    fn id(&self) -> i64;

    /// Decode a stored row.
    fn from_record(record: &Record) -> Result<Self, StorageError>;
}

/// Values for a row about to be inserted.
pub trait NewEntity: Send + Sync {
    type Entity: Entity;

    /// Field name / value pairs for every non-generated column.
    fn into_values(self) -> Vec<(&'static str, Value)>;
}
