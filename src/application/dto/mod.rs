//! Data Transfer Objects
//!
//! DTOs for request bodies and paginated responses.

pub mod request;
pub mod response;

pub use request::{
    CreateChatRequest, CreateCommentRequest, CreatePostRequest, CreateUserRequest,
    UpdateCommentRequest, UpdatePostRequest,
};
pub use response::{ChatDetail, Cursor, CursorPage, OffsetPage, Page, PostDetail};
