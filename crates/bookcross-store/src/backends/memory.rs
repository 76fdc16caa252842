//! In-memory backend
//!
//! An in-process implementation of the unit-of-work and document-store
//! contracts, used by the test suite and as a test double for application
//! services. Rows live in per-table vectors of column maps; documents in
//! per-collection maps keyed by id.
//!
//! The transactional scope is implemented with a snapshot taken at
//! `begin` and restored at `rollback`. That is enough for the single
//! logical operation a unit of work belongs to; it makes no attempt to
//! isolate two concurrently open units of work, which the contract does
//! not require.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::documents::{DocumentStore, StoredDocument};
use crate::entity::SqlValue;
use crate::error::{PersistenceError, StoreResult};
use crate::query::{Comparison, Filter, SelectPlan, SortDir};
use crate::uow::{StagedWrite, UnitOfWork};

type Row = HashMap<String, SqlValue>;
type Tables = HashMap<String, Vec<Row>>;

/// Shared in-memory relational state
///
/// Cloning the backend shares the underlying tables; call
/// [`unit_of_work`](Self::unit_of_work) per logical operation.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh unit of work over the shared tables
    pub fn unit_of_work(&self) -> MemoryUnitOfWork {
        MemoryUnitOfWork {
            tables: Arc::clone(&self.tables),
            staged: Vec::new(),
            snapshot: None,
        }
    }
}

/// In-memory [`UnitOfWork`]
pub struct MemoryUnitOfWork {
    tables: Arc<Mutex<Tables>>,
    staged: Vec<StagedWrite>,
    snapshot: Option<Tables>,
}

impl MemoryUnitOfWork {
    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn begin(&mut self) -> StoreResult<()> {
        if self.snapshot.is_some() {
            return Err(PersistenceError::Database(
                "a transaction is already active".to_string(),
            ));
        }
        let snapshot = self.lock().clone();
        self.snapshot = Some(snapshot);
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or(PersistenceError::NoActiveTransaction)
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or(PersistenceError::NoActiveTransaction)?;
        *self.lock() = snapshot;
        self.staged.clear();
        Ok(())
    }

    fn stage(&mut self, write: StagedWrite) {
        self.staged.push(write);
    }

    fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    async fn save_changes(&mut self) -> StoreResult<u64> {
        let staged = std::mem::take(&mut self.staged);
        let mut tables = self.lock();
        let mut affected = 0u64;

        for write in staged {
            match write {
                StagedWrite::Insert {
                    table,
                    columns,
                    values,
                } => {
                    let row: Row = columns
                        .iter()
                        .map(|c| c.to_string())
                        .zip(values.into_iter())
                        .collect();
                    tables.entry(table.to_string()).or_default().push(row);
                    affected += 1;
                }
                StagedWrite::Update {
                    table,
                    columns,
                    values,
                    key,
                } => {
                    // All columns in the key means there is nothing to set.
                    if columns.iter().all(|c| key.iter().any(|(k, _)| k == c)) {
                        continue;
                    }
                    let rows = tables.entry(table.to_string()).or_default();
                    for row in rows.iter_mut().filter(|row| matches_key(row, &key)) {
                        for (column, value) in columns.iter().zip(values.iter()) {
                            if key.iter().any(|(k, _)| k == column) {
                                continue;
                            }
                            row.insert(column.to_string(), value.clone());
                        }
                        affected += 1;
                    }
                }
                StagedWrite::Delete { table, key } => {
                    let rows = tables.entry(table.to_string()).or_default();
                    let before = rows.len();
                    rows.retain(|row| !matches_key(row, &key));
                    affected += (before - rows.len()) as u64;
                }
                StagedWrite::DeleteWhere { table, filters } => {
                    let rows = tables.entry(table.to_string()).or_default();
                    let before = rows.len();
                    rows.retain(|row| !filters.iter().all(|f| matches_filter(row, f)));
                    affected += (before - rows.len()) as u64;
                }
            }
        }

        Ok(affected)
    }

    async fn select(&mut self, plan: &SelectPlan) -> StoreResult<Vec<Vec<SqlValue>>> {
        let tables = self.lock();
        let mut rows: Vec<&Row> = tables
            .get(plan.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| plan.filters.iter().all(|f| matches_filter(row, f)))
                    .collect()
            })
            .unwrap_or_default();

        if !plan.order.is_empty() {
            rows.sort_by(|a, b| {
                for (column, dir) in &plan.order {
                    let ordering = column_value(a, column).compare(&column_value(b, column));
                    let ordering = match dir {
                        SortDir::Asc => ordering,
                        SortDir::Desc => ordering.reverse(),
                    };
                    if ordering != std::cmp::Ordering::Equal {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        let offset = plan.offset.unwrap_or(0).max(0) as usize;
        let limit = plan.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| {
                plan.columns
                    .iter()
                    .map(|column| column_value(row, column))
                    .collect()
            })
            .collect())
    }

    async fn count(&mut self, plan: &SelectPlan) -> StoreResult<i64> {
        let tables = self.lock();
        Ok(tables
            .get(plan.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| plan.filters.iter().all(|f| matches_filter(row, f)))
                    .count() as i64
            })
            .unwrap_or(0))
    }
}

fn column_value(row: &Row, column: &str) -> SqlValue {
    row.get(column).cloned().unwrap_or(SqlValue::Null)
}

fn matches_key(row: &Row, key: &[(&'static str, SqlValue)]) -> bool {
    key.iter()
        .all(|(column, value)| row.get(*column) == Some(value))
}

fn matches_filter(row: &Row, filter: &Filter) -> bool {
    use std::cmp::Ordering;
    let value = column_value(row, filter.column);
    match filter.op {
        Comparison::Eq => value == filter.value,
        Comparison::Ne => value != filter.value,
        Comparison::Lt => value.compare(&filter.value) == Ordering::Less,
        Comparison::Le => value.compare(&filter.value) != Ordering::Greater,
        Comparison::Gt => value.compare(&filter.value) == Ordering::Greater,
        Comparison::Ge => value.compare(&filter.value) != Ordering::Less,
        Comparison::Like => match (&value, &filter.value) {
            (SqlValue::Text(haystack), SqlValue::Text(pattern)) => haystack
                .to_lowercase()
                .contains(&pattern.trim_matches('%').to_lowercase()),
            _ => false,
        },
    }
}

/// In-memory [`DocumentStore`]
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<HashMap<String, BTreeMap<i64, StoredDocument>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, BTreeMap<i64, StoredDocument>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: i64) -> StoreResult<Option<StoredDocument>> {
        Ok(self
            .lock()
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .cloned())
    }

    async fn put(
        &self,
        collection: &str,
        id: i64,
        body: serde_json::Value,
        expected_version: Option<i64>,
    ) -> StoreResult<i64> {
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        let current = docs.get(&id).map(|doc| doc.version);

        let version = match (expected_version, current) {
            (Some(0), Some(_)) => {
                return Err(PersistenceError::Constraint(format!(
                    "document {collection}/{id} already exists"
                )))
            }
            (Some(expected), current) if expected > 0 && current != Some(expected) => {
                return Err(PersistenceError::ConcurrencyConflict(format!(
                    "document {collection}/{id} expected version {expected}, found {}",
                    current.unwrap_or(0)
                )))
            }
            (_, current) => current.unwrap_or(0) + 1,
        };

        docs.insert(id, StoredDocument { body, version });
        Ok(version)
    }

    async fn delete(&self, collection: &str, id: i64) -> StoreResult<bool> {
        Ok(self
            .lock()
            .get_mut(collection)
            .map(|docs| docs.remove(&id).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn insert(table: &'static str, columns: Vec<&'static str>, values: Vec<SqlValue>) -> StagedWrite {
        StagedWrite::Insert {
            table,
            columns,
            values,
        }
    }

    #[tokio::test]
    async fn test_rollback_restores_pre_transaction_state() {
        let backend = MemoryBackend::new();
        let mut uow = backend.unit_of_work();

        uow.stage(insert("t", vec!["id"], vec![SqlValue::Int(1)]));
        uow.save_changes().await.unwrap();

        uow.begin().await.unwrap();
        uow.stage(insert("t", vec!["id"], vec![SqlValue::Int(2)]));
        uow.save_changes().await.unwrap();
        uow.rollback().await.unwrap();

        let plan = SelectPlan {
            table: "t",
            columns: &["id"],
            filters: vec![],
            order: vec![],
            limit: None,
            offset: None,
        };
        assert_eq!(uow.count(&plan).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_without_begin_is_an_error() {
        let backend = MemoryBackend::new();
        let mut uow = backend.unit_of_work();
        assert!(matches!(
            uow.commit().await,
            Err(PersistenceError::NoActiveTransaction)
        ));
    }

    #[tokio::test]
    async fn test_delete_where_removes_matching_rows() {
        let backend = MemoryBackend::new();
        let mut uow = backend.unit_of_work();
        for (book, author) in [(7, 1), (7, 2), (8, 1)] {
            uow.stage(insert(
                "book_author",
                vec!["book_id", "author_id"],
                vec![SqlValue::Int(book), SqlValue::Int(author)],
            ));
        }
        uow.save_changes().await.unwrap();

        uow.stage(StagedWrite::DeleteWhere {
            table: "book_author",
            filters: vec![Filter {
                column: "book_id",
                op: Comparison::Eq,
                value: SqlValue::Int(7),
            }],
        });
        assert_eq!(uow.save_changes().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_document_cas_rejects_stale_version() {
        let store = MemoryDocumentStore::new();
        let v1 = store.put("c", 1, json!({"n": 1}), Some(0)).await.unwrap();
        assert_eq!(v1, 1);

        let v2 = store.put("c", 1, json!({"n": 2}), Some(v1)).await.unwrap();
        assert_eq!(v2, 2);

        let stale = store.put("c", 1, json!({"n": 3}), Some(v1)).await;
        assert!(matches!(
            stale,
            Err(PersistenceError::ConcurrencyConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_document_insert_only_conflicts_on_existing() {
        let store = MemoryDocumentStore::new();
        store.put("c", 1, json!({}), Some(0)).await.unwrap();
        assert!(matches!(
            store.put("c", 1, json!({}), Some(0)).await,
            Err(PersistenceError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn test_document_unconditional_put_is_last_writer_wins() {
        let store = MemoryDocumentStore::new();
        store.put("c", 1, json!({"n": 1}), None).await.unwrap();
        store.put("c", 1, json!({"n": 2}), None).await.unwrap();
        let doc = store.get("c", 1).await.unwrap().unwrap();
        assert_eq!(doc.body, json!({"n": 2}));
        assert_eq!(doc.version, 2);
    }
}
