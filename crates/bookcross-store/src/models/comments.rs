//! Comment-thread documents
//!
//! A book's comment thread is one root document per top-level comment,
//! with replies embedded inline as child nodes. Children exist only
//! inside their root; deleting the root deletes every reply with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::documents::{ChildNode, RootDocument};

/// A reply embedded in a root comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookChildComment {
    pub id: i64,
    pub owner_id: i64,
    pub text: String,
    pub date: DateTime<Utc>,
}

impl ChildNode for BookChildComment {
    fn id(&self) -> i64 {
        self.id
    }
}

/// A top-level comment on a book, with its replies embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRootComment {
    pub id: i64,
    pub book_id: i64,
    pub owner_id: i64,
    pub text: String,
    pub date: DateTime<Utc>,

    /// Store version for the compare-and-swap rewrite; maintained by the
    /// repositories, not by callers
    #[serde(default)]
    pub version: i64,

    #[serde(default)]
    pub comments: Vec<BookChildComment>,
}

impl BookRootComment {
    pub fn new(id: i64, book_id: i64, owner_id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            book_id,
            owner_id,
            text: text.into(),
            date: Utc::now(),
            version: 0,
            comments: Vec::new(),
        }
    }
}

impl RootDocument for BookRootComment {
    const COLLECTION: &'static str = "book_comments";

    type Child = BookChildComment;

    fn id(&self) -> i64 {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn children(&self) -> &[Self::Child] {
        &self.comments
    }

    fn children_mut(&mut self) -> &mut Vec<Self::Child> {
        &mut self.comments
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_document_round_trips_through_json() {
        let mut root = BookRootComment::new(1, 7, 11, "great book");
        root.comments.push(BookChildComment {
            id: 1,
            owner_id: 12,
            text: "agreed".to_string(),
            date: Utc::now(),
        });

        let body = serde_json::to_value(&root).unwrap();
        let loaded: BookRootComment = serde_json::from_value(body).unwrap();
        assert_eq!(loaded, root);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let loaded: BookRootComment = serde_json::from_value(serde_json::json!({
            "id": 1,
            "book_id": 7,
            "owner_id": 11,
            "text": "x",
            "date": "2026-08-30T12:00:00Z",
        }))
        .unwrap();
        assert_eq!(loaded.version, 0);
        assert!(loaded.comments.is_empty());
    }
}
