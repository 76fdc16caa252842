//! Unit of work abstraction
//!
//! The unit of work is the session-scoped handle every repository in one
//! logical operation shares. Repositories stage writes into it; a single
//! `save_changes` flushes everything staged, in order, to the backing
//! store. Explicit `begin`/`commit`/`rollback` provide atomicity across
//! several flushes, which no single flush guarantees on its own.
//!
//! A unit of work belongs to exactly one logical operation. It is `Send`
//! but deliberately not shared: concurrent operations each open their own.

use async_trait::async_trait;

use crate::entity::SqlValue;
use crate::error::StoreResult;
use crate::query::{Filter, SelectPlan};

/// A write staged on the unit of work, applied at the next flush
#[derive(Debug, Clone)]
pub enum StagedWrite {
    Insert {
        table: &'static str,
        columns: Vec<&'static str>,
        values: Vec<SqlValue>,
    },
    /// Update by primary key. Key columns are excluded from the SET list.
    /// Matching zero rows is a no-op, not an error.
    Update {
        table: &'static str,
        columns: Vec<&'static str>,
        values: Vec<SqlValue>,
        key: Vec<(&'static str, SqlValue)>,
    },
    Delete {
        table: &'static str,
        key: Vec<(&'static str, SqlValue)>,
    },
    /// Bulk delete of every row matching the filters
    DeleteWhere {
        table: &'static str,
        filters: Vec<Filter>,
    },
}

/// Session-scoped storage handle shared by the repositories of one
/// logical operation
///
/// Implementations: [`PgUnitOfWork`](crate::backends::PgUnitOfWork) for
/// Postgres, [`MemoryUnitOfWork`](crate::backends::MemoryUnitOfWork) as an
/// in-process test double.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Open an explicit transaction scope
    ///
    /// Everything flushed before `commit` becomes atomic; `rollback` (or
    /// dropping the scope on failure) discards it all.
    async fn begin(&mut self) -> StoreResult<()>;

    /// Commit the open transaction scope
    async fn commit(&mut self) -> StoreResult<()>;

    /// Roll back the open transaction scope, discarding flushed and staged
    /// writes alike
    async fn rollback(&mut self) -> StoreResult<()>;

    /// Stage a write for the next flush; no I/O happens here
    fn stage(&mut self, write: StagedWrite);

    /// Whether any writes are currently staged
    fn has_staged(&self) -> bool;

    /// Flush all staged writes in staging order, one round trip
    ///
    /// Returns the number of affected rows. Fails with a
    /// `PersistenceError` on constraint violation, connectivity loss, or
    /// concurrency conflict; staged writes are consumed either way.
    async fn save_changes(&mut self) -> StoreResult<u64>;

    /// Execute a select plan, returning rows in `plan.columns` order
    async fn select(&mut self, plan: &SelectPlan) -> StoreResult<Vec<Vec<SqlValue>>>;

    /// Count rows matching the plan's filters, ignoring any window
    async fn count(&mut self, plan: &SelectPlan) -> StoreResult<i64>;
}
