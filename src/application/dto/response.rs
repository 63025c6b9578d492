//! Response DTOs
//!
//! Pagination envelopes and composite read models.

use serde::Serialize;

use crate::domain::{Chat, ChatMember, Image, Post, User};

/// Continuation marker of a cursor page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cursor {
    /// Identity of the last row when another page may follow.
    pub after: Option<i64>,
}

/// `{data, cursor: {after}, count, next}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CursorPage<T> {
    pub data: Vec<T>,
    pub cursor: Cursor,
    pub count: usize,
    pub next: Option<String>,
}

/// `{data, total}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffsetPage<T> {
    pub data: Vec<T>,
    /// Rows matching the filters, ignoring the window.
    pub total: u64,
}

/// One page of a listing, in either pagination mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Page<T> {
    Cursor(CursorPage<T>),
    Offset(OffsetPage<T>),
}

impl<T> Page<T> {
    pub fn data(&self) -> &[T] {
        match self {
            Page::Cursor(page) => &page.data,
            Page::Offset(page) => &page.data,
        }
    }

    pub fn into_data(self) -> Vec<T> {
        match self {
            Page::Cursor(page) => page.data,
            Page::Offset(page) => page.data,
        }
    }

    /// Replace the rows, keeping the envelope.
    pub fn with_data<U>(self, data: Vec<U>) -> Page<U> {
        match self {
            Page::Cursor(page) => Page::Cursor(CursorPage {
                data,
                cursor: page.cursor,
                count: page.count,
                next: page.next,
            }),
            Page::Offset(page) => Page::Offset(OffsetPage {
                data,
                total: page.total,
            }),
        }
    }

    pub fn as_cursor(&self) -> Option<&CursorPage<T>> {
        match self {
            Page::Cursor(page) => Some(page),
            Page::Offset(_) => None,
        }
    }

    pub fn as_offset(&self) -> Option<&OffsetPage<T>> {
        match self {
            Page::Offset(page) => Some(page),
            Page::Cursor(_) => None,
        }
    }
}

/// A post together with its author and its images, ordered by `order`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    /// `None` when the author row is gone.
    pub author: Option<User>,
    pub images: Vec<Image>,
}

/// A chat together with its memberships.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatDetail {
    #[serde(flatten)]
    pub chat: Chat,
    pub members: Vec<ChatMember>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_page_shape() {
        let page: Page<i64> = Page::Cursor(CursorPage {
            data: vec![1, 2],
            cursor: Cursor { after: Some(2) },
            count: 2,
            next: Some("http://localhost:3000/posts?where__id__more_than=2".into()),
        });
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({
                "data": [1, 2],
                "cursor": {"after": 2},
                "count": 2,
                "next": "http://localhost:3000/posts?where__id__more_than=2"
            })
        );
    }

    #[test]
    fn test_empty_cursor_page_has_null_links() {
        let page: Page<i64> = Page::Cursor(CursorPage {
            data: vec![],
            cursor: Cursor { after: None },
            count: 0,
            next: None,
        });
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({"data": [], "cursor": {"after": null}, "count": 0, "next": null})
        );
    }

    #[test]
    fn test_offset_page_shape() {
        let page: Page<i64> = Page::Offset(OffsetPage {
            data: vec![3],
            total: 7,
        });
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({"data": [3], "total": 7})
        );
    }

    #[test]
    fn test_with_data_keeps_envelope() {
        let page: Page<i64> = Page::Cursor(CursorPage {
            data: vec![4, 5],
            cursor: Cursor { after: Some(5) },
            count: 2,
            next: Some("http://localhost:3000/posts?where__id__more_than=5".into()),
        });
        let mapped = page.with_data(vec!["four", "five"]);
        let cursor = mapped.as_cursor().unwrap();
        assert_eq!(cursor.data, vec!["four", "five"]);
        assert_eq!(cursor.cursor.after, Some(5));
        assert_eq!(cursor.count, 2);

        let offset: Page<i64> = Page::Offset(OffsetPage { data: vec![1], total: 9 });
        assert_eq!(offset.with_data(vec![()]).as_offset().unwrap().total, 9);
    }
}
