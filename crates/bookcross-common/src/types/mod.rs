//! Shared types used across BookCross crates
//!
//! This module contains the pagination request and result shapes that
//! both the persistence layer and its callers speak.

use serde::{Deserialize, Serialize};

// ============================================================================
// Pagination
// ============================================================================

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination parameters for list queries.
///
/// Page numbers are 1-indexed. The order key, when present, must name a
/// column of the queried entity; when absent, ordering falls back to the
/// primary key ascending so page contents stay stable across requests.
///
/// # Examples
///
/// ```rust,ignore
/// use bookcross_common::types::PageParams;
///
/// let params = PageParams::new(2, 20).order_by("name", false);
/// assert_eq!(params.offset(), 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageParams {
    /// Page number (1-indexed)
    pub page: i64,

    /// Items per page, capped at [`MAX_PAGE_SIZE`]
    pub page_size: i64,

    /// Optional sort key; must be a column of the queried entity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    /// Sort direction for `order_by`
    #[serde(default)]
    pub descending: bool,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            order_by: None,
            descending: false,
        }
    }
}

impl PageParams {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    /// Set the sort key and direction.
    pub fn order_by(mut self, key: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(key.into());
        self.descending = descending;
        self
    }

    /// Offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// One page of projected results.
///
/// # Examples
///
/// ```rust,ignore
/// use bookcross_common::types::{Page, PageParams};
///
/// let page = Page::from_items(vec![1, 2, 3], &PageParams::new(1, 10), 3);
/// assert_eq!(page.pages, 1);
/// assert!(!page.has_next);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on the current page; at most `page_size` of them
    pub items: Vec<T>,

    /// Total number of items across all pages
    pub total: i64,

    /// Current page number (1-indexed)
    pub page: i64,

    /// Items per page
    pub page_size: i64,

    /// Total number of pages: `ceil(total / page_size)`
    pub pages: i64,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Build a page descriptor from items, params, and total count.
    pub fn from_items(items: Vec<T>, params: &PageParams, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + params.page_size - 1) / params.page_size
        };

        Self {
            items,
            total,
            page: params.page,
            page_size: params.page_size,
            pages,
            has_next: params.page < pages,
            has_prev: params.page > 1,
        }
    }

    /// Map items to a different type, keeping the metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            pages: self.pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_is_zero_based_window_start() {
        assert_eq!(PageParams::new(1, 10).offset(), 0);
        assert_eq!(PageParams::new(3, 25).offset(), 50);
    }

    #[test]
    fn test_page_metadata() {
        let page = Page::from_items(vec![1, 2, 3], &PageParams::new(2, 10), 25);
        assert_eq!(page.pages, 3);
        assert!(page.has_prev);
        assert!(page.has_next);

        let empty = Page::from_items(Vec::<i32>::new(), &PageParams::new(1, 10), 0);
        assert_eq!(empty.pages, 0);
        assert!(!empty.has_prev);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_page_map_keeps_metadata() {
        let page = Page::from_items(vec![1, 2, 3], &PageParams::new(1, 10), 3).map(|x| x * 2);
        assert_eq!(page.items, vec![2, 4, 6]);
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn test_params_round_trip_through_json() {
        let params = PageParams::new(2, 10).order_by("name", true);
        let json = serde_json::to_string(&params).unwrap();
        let back: PageParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.page, 2);
        assert_eq!(back.order_by.as_deref(), Some("name"));
        assert!(back.descending);
    }
}
