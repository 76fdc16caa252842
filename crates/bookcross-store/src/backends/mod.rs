//! Storage backends
//!
//! Two implementations of the unit-of-work and document-store contracts:
//! Postgres (sqlx) for production and an in-memory backend used by the
//! test suite and as a test double for application services.

mod memory;
mod postgres;

pub use memory::{MemoryBackend, MemoryDocumentStore, MemoryUnitOfWork};
pub use postgres::{ensure_schema, PgDocumentStore, PgUnitOfWork};
