//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **PaginationService**: Offset and cursor pages with `next` links
//! - **PostService**: Posts, their images and the comment counter
//! - **ImageService**: Attaching uploaded files to posts
//! - **CommentService**: Comments on posts
//! - **UserService**: Accounts and the follow lifecycle
//! - **ChatService**: Chat rooms and memberships
//!
//! Multi-step writes run inside a [`TransactionScope`](crate::infrastructure::database::TransactionScope)
//! and either all apply or none do.

pub mod chat_service;
pub mod comment_service;
pub mod image_service;
pub mod pagination_service;
pub mod post_service;
pub mod user_service;

pub use chat_service::ChatService;
pub use comment_service::CommentService;
pub use image_service::ImageService;
pub use pagination_service::{PaginationService, CURSOR_AFTER_KEY, CURSOR_BEFORE_KEY};
pub use post_service::PostService;
pub use user_service::UserService;
