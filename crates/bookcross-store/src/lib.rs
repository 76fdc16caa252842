//! # bookcross-store
//!
//! Persistence layer for the book-exchange backend.
//!
//! ## Architecture
//!
//! Entities describe their own table shape through the [`Entity`] trait.
//! A single generic [`Repository`] stages writes against a [`UnitOfWork`],
//! which buffers them until `save_changes` flushes the batch to the
//! backing store. Two backends implement the unit of work: a Postgres
//! transaction wrapper and an in-memory table store used by the tests.
//!
//! Aggregates with many-to-many links (books with their authors and
//! genres) go through [`associations::update_aggregate`], which replaces
//! link rows transactionally. Comment threads live in a document store
//! with optimistic versioning, accessed through [`documents::RootRepository`]
//! and [`documents::ChildRepository`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use bookcross_store::{MemoryBackend, Repository, models::Genre};
//!
//! let backend = MemoryBackend::new();
//! let mut uow = backend.unit_of_work();
//! let genres: Repository<Genre> = Repository::new();
//! genres.add(&mut uow, &Genre { id: 1, name: "Poetry".into() });
//! genres.save_changes(&mut uow).await?;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod associations;
pub mod backends;
pub mod config;
pub mod documents;
pub mod entity;
pub mod error;
pub mod models;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod uow;

pub use associations::{update_aggregate, remove_aggregate, Aggregate, AssociationKind};
pub use backends::{
    ensure_schema, MemoryBackend, MemoryDocumentStore, MemoryUnitOfWork, PgDocumentStore,
    PgUnitOfWork,
};
pub use config::DatabaseConfig;
pub use documents::{ChildNode, ChildRepository, DocumentStore, RootDocument, RootRepository};
pub use entity::{Entity, SqlValue};
pub use error::{PersistenceError, StoreResult};
pub use pagination::{get_page, validate_params, Page, PageParams, PaginationError, MAX_PAGE_SIZE};
pub use query::{Comparison, Filter, SelectPlan, SelectQuery, SortDir};
pub use repository::Repository;
pub use uow::{StagedWrite, UnitOfWork};
