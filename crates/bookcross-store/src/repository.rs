//! Generic relational repository
//!
//! One repository type serves every relational entity: [`Repository<T>`]
//! is a zero-sized handle whose behavior comes entirely from the
//! [`Entity`] metadata of `T` and the [`UnitOfWork`] it is given. The
//! repository itself holds no connection and no staged state; staging
//! lives on the unit of work, so several repositories sharing one unit of
//! work flush together, whichever of them calls `save_changes`.

use std::marker::PhantomData;

use crate::entity::{Entity, SqlValue};
use crate::error::StoreResult;
use crate::query::{Comparison, SelectQuery};
use crate::uow::{StagedWrite, UnitOfWork};

/// Typed CRUD and query access over a single entity type
///
/// # Examples
///
/// ```rust,ignore
/// use bookcross_store::repository::Repository;
/// use bookcross_store::models::Author;
///
/// let authors = Repository::<Author>::new();
/// authors.add(&mut uow, &author);
/// let affected = authors.save_changes(&mut uow).await?;
/// ```
#[derive(Debug)]
pub struct Repository<T: Entity> {
    _entity: PhantomData<T>,
}

impl<T: Entity> Default for Repository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Entity> Repository<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    /// Start a lazy query; nothing executes until it is fetched
    pub fn query(&self) -> SelectQuery<T> {
        SelectQuery::new()
    }

    /// Execute a query and materialize the matching entities
    pub async fn fetch<U>(&self, uow: &mut U, query: SelectQuery<T>) -> StoreResult<Vec<T>>
    where
        U: UnitOfWork + ?Sized,
    {
        let rows = uow.select(&query.plan()).await?;
        rows.iter().map(|row| T::from_values(row)).collect()
    }

    /// Execute a query and return the first match, if any
    ///
    /// Not-found is `None`, never an error.
    pub async fn fetch_one<U>(&self, uow: &mut U, query: SelectQuery<T>) -> StoreResult<Option<T>>
    where
        U: UnitOfWork + ?Sized,
    {
        let mut rows = self.fetch(uow, query.limit(1)).await?;
        Ok(rows.pop())
    }

    /// Fetch a single entity by its integer primary key
    pub async fn get_by_id<U>(&self, uow: &mut U, id: i64) -> StoreResult<Option<T>>
    where
        U: UnitOfWork + ?Sized,
    {
        self.fetch_one(
            uow,
            self.query().filter(T::ID_COLUMN, Comparison::Eq, SqlValue::Int(id)),
        )
        .await
    }

    /// Whether any row matches the query
    pub async fn exists<U>(&self, uow: &mut U, query: SelectQuery<T>) -> StoreResult<bool>
    where
        U: UnitOfWork + ?Sized,
    {
        Ok(uow.count(&query.plan()).await? > 0)
    }

    /// Stage an insert; nothing persists until `save_changes`
    pub fn add<U>(&self, uow: &mut U, entity: &T)
    where
        U: UnitOfWork + ?Sized,
    {
        uow.stage(StagedWrite::Insert {
            table: T::TABLE,
            columns: T::columns().to_vec(),
            values: entity.values(),
        });
    }

    /// Stage inserts for a batch of entities
    pub fn add_range<U>(&self, uow: &mut U, entities: &[T])
    where
        U: UnitOfWork + ?Sized,
    {
        for entity in entities {
            self.add(uow, entity);
        }
    }

    /// Stage an update by primary key
    ///
    /// If no row matches the key at flush time the update affects zero
    /// rows and is silently a no-op; callers wanting to know must check
    /// existence first.
    pub fn update<U>(&self, uow: &mut U, entity: &T)
    where
        U: UnitOfWork + ?Sized,
    {
        uow.stage(StagedWrite::Update {
            table: T::TABLE,
            columns: T::columns().to_vec(),
            values: entity.values(),
            key: entity.key(),
        });
    }

    /// Stage a delete by primary key
    pub fn remove<U>(&self, uow: &mut U, entity: &T)
    where
        U: UnitOfWork + ?Sized,
    {
        uow.stage(StagedWrite::Delete {
            table: T::TABLE,
            key: entity.key(),
        });
    }

    /// Stage deletes for a batch of entities
    pub fn remove_range<U>(&self, uow: &mut U, entities: &[T])
    where
        U: UnitOfWork + ?Sized,
    {
        for entity in entities {
            self.remove(uow, entity);
        }
    }

    /// Flush every write staged on the unit of work, in one round trip
    ///
    /// This flushes writes staged through *any* repository sharing the
    /// unit of work, mirroring the shared session the repositories
    /// coordinate around.
    pub async fn save_changes<U>(&self, uow: &mut U) -> StoreResult<u64>
    where
        U: UnitOfWork + ?Sized,
    {
        uow.save_changes().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;
    use crate::models::{Author, BookAuthor, Genre};
    use crate::query::SortDir;

    fn author(id: i64, first: &str, last: &str) -> Author {
        Author {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            middle_name: None,
        }
    }

    #[tokio::test]
    async fn test_add_is_staged_until_save_changes() {
        let backend = MemoryBackend::new();
        let repo = Repository::<Author>::new();

        let mut uow = backend.unit_of_work();
        repo.add(&mut uow, &author(1, "Terry", "Pratchett"));
        assert!(uow.has_staged());

        // A second unit of work sees nothing before the flush.
        let mut other = backend.unit_of_work();
        assert_eq!(repo.get_by_id(&mut other, 1).await.unwrap(), None);

        let affected = repo.save_changes(&mut uow).await.unwrap();
        assert_eq!(affected, 1);
        assert!(repo.get_by_id(&mut other, 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_noop() {
        let backend = MemoryBackend::new();
        let repo = Repository::<Author>::new();

        let mut uow = backend.unit_of_work();
        repo.update(&mut uow, &author(42, "Nobody", "Here"));
        let affected = repo.save_changes(&mut uow).await.unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_update_of_all_key_entity_is_a_staged_noop() {
        let backend = MemoryBackend::new();
        let repo = Repository::<BookAuthor>::new();

        let link = BookAuthor {
            book_id: 7,
            author_id: 1,
        };
        let mut uow = backend.unit_of_work();
        repo.add(&mut uow, &link);
        repo.save_changes(&mut uow).await.unwrap();

        // Every column of a join row is part of the key; there is nothing
        // to set, so the staged update must flush as zero affected rows.
        repo.update(&mut uow, &link);
        assert_eq!(repo.save_changes(&mut uow).await.unwrap(), 0);
        assert!(repo.get_by_id(&mut uow, 7).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_repositories_share_staging_on_one_uow() {
        let backend = MemoryBackend::new();
        let authors = Repository::<Author>::new();
        let genres = Repository::<Genre>::new();

        let mut uow = backend.unit_of_work();
        authors.add(&mut uow, &author(1, "Ursula", "Le Guin"));
        genres.add(
            &mut uow,
            &Genre {
                id: 5,
                name: "Fantasy".to_string(),
            },
        );

        // Flushing through either repository flushes both staged writes.
        let affected = authors.save_changes(&mut uow).await.unwrap();
        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn test_fetch_with_order_and_window() {
        let backend = MemoryBackend::new();
        let repo = Repository::<Genre>::new();

        let mut uow = backend.unit_of_work();
        for (id, name) in [(1, "Sci-Fi"), (2, "Fantasy"), (3, "Poetry")] {
            repo.add(
                &mut uow,
                &Genre {
                    id,
                    name: name.to_string(),
                },
            );
        }
        repo.save_changes(&mut uow).await.unwrap();

        let page = repo
            .fetch(
                &mut uow,
                repo.query().order_by("name", SortDir::Asc).limit(2).offset(1),
            )
            .await
            .unwrap();
        let names: Vec<_> = page.into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["Poetry", "Sci-Fi"]);
    }

    #[tokio::test]
    async fn test_remove_range_deletes_all() {
        let backend = MemoryBackend::new();
        let repo = Repository::<Author>::new();

        let mut uow = backend.unit_of_work();
        let rows = vec![author(1, "A", "A"), author(2, "B", "B")];
        repo.add_range(&mut uow, &rows);
        repo.save_changes(&mut uow).await.unwrap();

        repo.remove_range(&mut uow, &rows);
        let affected = repo.save_changes(&mut uow).await.unwrap();
        assert_eq!(affected, 2);
        assert_eq!(repo.fetch(&mut uow, repo.query()).await.unwrap().len(), 0);
    }
}
