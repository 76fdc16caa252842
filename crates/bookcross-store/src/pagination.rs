//! Generic pagination and projection
//!
//! One generic path serves every entity: count the filtered sequence,
//! apply a stable ordering, window with offset/limit, then project only
//! the windowed rows to the output shape. Ordering always precedes
//! windowing; without that, page contents are undefined across pages.
//!
//! The request and result shapes ([`PageParams`], [`Page`]) live in
//! `bookcross_common::types` so callers outside the persistence layer
//! can speak them without depending on this crate.
//!
//! # Examples
//!
//! ```rust,ignore
//! use bookcross_store::pagination::{get_page, PageParams};
//!
//! let params = PageParams::new(2, 10);
//! let page = get_page(&mut uow, repo.query(), &params, BookDto::from).await?;
//! assert!(page.items.len() <= 10);
//! ```

use thiserror::Error;

pub use bookcross_common::types::{Page, PageParams, MAX_PAGE_SIZE};

use crate::entity::Entity;
use crate::error::PersistenceError;
use crate::query::{SelectQuery, SortDir};
use crate::repository::Repository;
use crate::uow::UnitOfWork;

/// Errors from page requests
///
/// Parameter problems are rejected before any store access.
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("Page must be greater than 0, got {0}")]
    InvalidPage(i64),

    #[error("Page size must be between 1 and {MAX_PAGE_SIZE}, got {0}")]
    InvalidPageSize(i64),

    #[error("Unknown order key: {0}")]
    UnknownOrderKey(String),

    #[error(transparent)]
    Store(#[from] PersistenceError),
}

/// Validate page parameters; called before any store access
pub fn validate_params(params: &PageParams) -> Result<(), PaginationError> {
    if params.page < 1 {
        return Err(PaginationError::InvalidPage(params.page));
    }
    if params.page_size < 1 || params.page_size > MAX_PAGE_SIZE {
        return Err(PaginationError::InvalidPageSize(params.page_size));
    }
    Ok(())
}

/// Turn a relational query plus page parameters into a page of projected
/// results
///
/// The count query runs against the filtered sequence; the window query
/// orders (caller key, or primary key ascending) before applying
/// offset/limit; projection runs only on the windowed entities. A page
/// number beyond the last page yields an empty item list with correct
/// metadata, not an error.
pub async fn get_page<T, U, Out, F>(
    uow: &mut U,
    query: SelectQuery<T>,
    params: &PageParams,
    project: F,
) -> Result<Page<Out>, PaginationError>
where
    T: Entity,
    U: UnitOfWork + ?Sized,
    F: FnMut(T) -> Out,
{
    validate_params(params)?;

    let order_key = match &params.order_by {
        Some(key) if T::columns().contains(&key.as_str()) => key.clone(),
        Some(key) => return Err(PaginationError::UnknownOrderKey(key.clone())),
        None => T::ID_COLUMN.to_string(),
    };
    let dir = if params.descending { SortDir::Desc } else { SortDir::Asc };

    let total = uow.count(&query.plan()).await?;

    let windowed = query
        .order_by(order_key, dir)
        .offset(params.offset())
        .limit(params.page_size);
    let items = Repository::<T>::new().fetch(uow, windowed).await?;

    tracing::debug!(
        table = T::TABLE,
        page = params.page,
        page_size = params.page_size,
        total,
        "page query executed"
    );

    Ok(Page::from_items(items, params, total).map(project))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;
    use crate::models::Genre;
    use proptest::prelude::*;

    fn params(page: i64, size: i64) -> PageParams {
        PageParams::new(page, size)
    }

    #[test]
    fn test_params_validation() {
        assert!(validate_params(&params(1, 20)).is_ok());
        assert!(matches!(
            validate_params(&params(0, 20)),
            Err(PaginationError::InvalidPage(0))
        ));
        assert!(matches!(
            validate_params(&params(-3, 20)),
            Err(PaginationError::InvalidPage(-3))
        ));
        assert!(matches!(
            validate_params(&params(1, 0)),
            Err(PaginationError::InvalidPageSize(0))
        ));
        assert!(matches!(
            validate_params(&params(1, MAX_PAGE_SIZE + 1)),
            Err(PaginationError::InvalidPageSize(_))
        ));
    }

    async fn seeded_backend(total: i64) -> MemoryBackend {
        let backend = MemoryBackend::new();
        let repo = Repository::<Genre>::new();
        let mut uow = backend.unit_of_work();
        for id in 1..=total {
            repo.add(
                &mut uow,
                &Genre {
                    id,
                    name: format!("genre-{id:03}"),
                },
            );
        }
        repo.save_changes(&mut uow).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_fifteen_items_page_two_of_ten() {
        let backend = seeded_backend(15).await;
        let mut uow = backend.unit_of_work();
        let repo = Repository::<Genre>::new();

        let page = get_page(&mut uow, repo.query(), &params(2, 10), |g: Genre| g.id)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 15);
        assert_eq!(page.pages, 2);
        assert_eq!(page.items, vec![11, 12, 13, 14, 15]);
    }

    #[tokio::test]
    async fn test_page_beyond_range_is_empty_not_error() {
        let backend = seeded_backend(15).await;
        let mut uow = backend.unit_of_work();
        let repo = Repository::<Genre>::new();

        let page = get_page(&mut uow, repo.query(), &params(3, 10), |g: Genre| g.id)
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 15);
        assert_eq!(page.pages, 2);
    }

    #[tokio::test]
    async fn test_explicit_order_key_applies_before_window() {
        let backend = seeded_backend(5).await;
        let mut uow = backend.unit_of_work();
        let repo = Repository::<Genre>::new();

        let request = params(1, 2).order_by("name", true);
        let page = get_page(&mut uow, repo.query(), &request, |g: Genre| g.name)
            .await
            .unwrap();
        assert_eq!(page.items, vec!["genre-005", "genre-004"]);
    }

    #[tokio::test]
    async fn test_unknown_order_key_is_rejected() {
        let backend = seeded_backend(1).await;
        let mut uow = backend.unit_of_work();
        let repo = Repository::<Genre>::new();

        let request = params(1, 10).order_by("no_such_column", false);
        let result = get_page(&mut uow, repo.query(), &request, |g: Genre| g.id).await;
        assert!(matches!(result, Err(PaginationError::UnknownOrderKey(_))));
    }

    proptest! {
        #[test]
        fn prop_page_count_is_ceiling_of_total_over_size(
            total in 0i64..10_000,
            size in 1i64..=MAX_PAGE_SIZE,
            page in 1i64..50,
        ) {
            let descriptor = Page::from_items(Vec::<i64>::new(), &params(page, size), total);
            let expected = (total + size - 1) / size;
            prop_assert_eq!(descriptor.pages, expected);
            prop_assert_eq!(descriptor.has_prev, page > 1);
            prop_assert_eq!(descriptor.has_next, page < expected);
        }
    }
}
