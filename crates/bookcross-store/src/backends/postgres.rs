//! Postgres backend
//!
//! Implements the unit-of-work contract over a sqlx `PgPool`, and the
//! document-store contract over a JSONB collection table. SQL is
//! assembled at runtime from entity metadata with `QueryBuilder`; values
//! always travel as bind parameters. Identifiers (table names, column
//! names, order keys) come from `Entity` constants or are validated
//! against them before they reach this module.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::{Column, QueryBuilder, Row, Transaction, TypeInfo};

use crate::documents::{DocumentStore, StoredDocument};
use crate::entity::SqlValue;
use crate::error::{PersistenceError, StoreResult};
use crate::query::{Comparison, Filter, SelectPlan, SortDir};
use crate::uow::{StagedWrite, UnitOfWork};

/// Schema for the relational tables and the document collection table.
/// Identifiers are caller-assigned, so no columns are generated.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS author (
    id          BIGINT PRIMARY KEY,
    first_name  VARCHAR(20) NOT NULL,
    last_name   VARCHAR(20) NOT NULL,
    middle_name VARCHAR(30)
);

CREATE TABLE IF NOT EXISTS genre (
    id   BIGINT PRIMARY KEY,
    name VARCHAR(50) NOT NULL
);

CREATE TABLE IF NOT EXISTS book (
    id        BIGINT PRIMARY KEY,
    name      VARCHAR(150) NOT NULL,
    user_id   BIGINT,
    publisher VARCHAR(150),
    available BOOLEAN NOT NULL DEFAULT TRUE,
    notice    TEXT
);

CREATE TABLE IF NOT EXISTS book_author (
    book_id   BIGINT NOT NULL REFERENCES book (id),
    author_id BIGINT NOT NULL REFERENCES author (id),
    PRIMARY KEY (book_id, author_id)
);

CREATE TABLE IF NOT EXISTS book_genre (
    book_id  BIGINT NOT NULL REFERENCES book (id),
    genre_id BIGINT NOT NULL REFERENCES genre (id),
    PRIMARY KEY (book_id, genre_id)
);

CREATE TABLE IF NOT EXISTS documents (
    collection TEXT   NOT NULL,
    id         BIGINT NOT NULL,
    version    BIGINT NOT NULL,
    body       JSONB  NOT NULL,
    PRIMARY KEY (collection, id)
);
"#;

/// Create the BookCross tables if they do not exist
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Postgres [`UnitOfWork`]
///
/// Holds at most one open transaction. Outside a transaction, flushes and
/// selects run directly against the pool; inside one, everything runs on
/// the transaction's connection until `commit` or `rollback`.
pub struct PgUnitOfWork {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    staged: Vec<StagedWrite>,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: None,
            staged: Vec::new(),
        }
    }

    async fn execute_write(&mut self, write: &StagedWrite) -> StoreResult<u64> {
        let Some(mut builder) = build_write(write) else {
            return Ok(0);
        };
        let query = builder.build();
        let result = match self.tx.as_mut() {
            Some(tx) => query.execute(&mut **tx).await?,
            None => query.execute(&self.pool).await?,
        };
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn begin(&mut self) -> StoreResult<()> {
        if self.tx.is_some() {
            return Err(PersistenceError::Database(
                "a transaction is already active".to_string(),
            ));
        }
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(PersistenceError::NoActiveTransaction)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(PersistenceError::NoActiveTransaction)?;
        tx.rollback().await?;
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
        let mut affected = 0u64;
        for write in &staged {
            affected += self.execute_write(write).await?;
        }
        tracing::trace!(writes = staged.len(), affected, "flushed staged writes");
        Ok(affected)
    }

    async fn select(&mut self, plan: &SelectPlan) -> StoreResult<Vec<Vec<SqlValue>>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(plan.columns.join(", "));
        builder.push(" FROM ");
        builder.push(plan.table);
        push_filters(&mut builder, &plan.filters);

        if !plan.order.is_empty() {
            builder.push(" ORDER BY ");
            for (i, (column, dir)) in plan.order.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                builder.push(column.as_str());
                builder.push(match dir {
                    SortDir::Asc => " ASC",
                    SortDir::Desc => " DESC",
                });
            }
        }
        if let Some(limit) = plan.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }
        if let Some(offset) = plan.offset {
            builder.push(" OFFSET ");
            builder.push_bind(offset);
        }

        let query = builder.build();
        let rows = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await?,
            None => query.fetch_all(&self.pool).await?,
        };

        rows.iter()
            .map(|row| {
                (0..plan.columns.len())
                    .map(|index| decode_column(row, index))
                    .collect::<StoreResult<Vec<SqlValue>>>()
            })
            .collect()
    }

    async fn count(&mut self, plan: &SelectPlan) -> StoreResult<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        builder.push(plan.table);
        push_filters(&mut builder, &plan.filters);

        let query = builder.build();
        let row = match self.tx.as_mut() {
            Some(tx) => query.fetch_one(&mut **tx).await?,
            None => query.fetch_one(&self.pool).await?,
        };
        Ok(row.try_get::<i64, _>(0)?)
    }
}

/// Lower a staged write into SQL. `None` when the write has no effect
/// to execute (an update whose columns are all key columns).
fn build_write(write: &StagedWrite) -> Option<QueryBuilder<'static, Postgres>> {
    match write {
        StagedWrite::Insert {
            table,
            columns,
            values,
        } => {
            let mut builder = QueryBuilder::new("INSERT INTO ");
            builder.push(*table);
            builder.push(" (");
            builder.push(columns.join(", "));
            builder.push(") VALUES (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(&mut builder, value);
            }
            builder.push(")");
            Some(builder)
        }
        StagedWrite::Update {
            table,
            columns,
            values,
            key,
        } => {
            let set: Vec<_> = columns
                .iter()
                .zip(values.iter())
                .filter(|(column, _)| !key.iter().any(|(k, _)| k == *column))
                .collect();
            if set.is_empty() {
                return None;
            }
            let mut builder = QueryBuilder::new("UPDATE ");
            builder.push(*table);
            builder.push(" SET ");
            for (i, (column, value)) in set.into_iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                builder.push(*column);
                builder.push(" = ");
                push_value(&mut builder, value);
            }
            push_key(&mut builder, key);
            Some(builder)
        }
        StagedWrite::Delete { table, key } => {
            let mut builder = QueryBuilder::new("DELETE FROM ");
            builder.push(*table);
            push_key(&mut builder, key);
            Some(builder)
        }
        StagedWrite::DeleteWhere { table, filters } => {
            let mut builder = QueryBuilder::new("DELETE FROM ");
            builder.push(*table);
            push_filters(&mut builder, filters);
            Some(builder)
        }
    }
}

fn push_key(builder: &mut QueryBuilder<'static, Postgres>, key: &[(&'static str, SqlValue)]) {
    builder.push(" WHERE ");
    for (i, (column, value)) in key.iter().enumerate() {
        if i > 0 {
            builder.push(" AND ");
        }
        builder.push(*column);
        builder.push(" = ");
        push_value(builder, value);
    }
}

fn push_filters(builder: &mut QueryBuilder<'static, Postgres>, filters: &[Filter]) {
    if filters.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            builder.push(" AND ");
        }
        builder.push(filter.column);
        // NULL never compares equal; lower equality on NULL to IS [NOT] NULL.
        if filter.value.is_null() && matches!(filter.op, Comparison::Eq | Comparison::Ne) {
            builder.push(match filter.op {
                Comparison::Eq => " IS NULL",
                _ => " IS NOT NULL",
            });
            continue;
        }
        builder.push(match filter.op {
            Comparison::Eq => " = ",
            Comparison::Ne => " <> ",
            Comparison::Lt => " < ",
            Comparison::Le => " <= ",
            Comparison::Gt => " > ",
            Comparison::Ge => " >= ",
            Comparison::Like => " ILIKE ",
        });
        if filter.op == Comparison::Like {
            if let Some(pattern) = filter.value.as_text() {
                builder.push_bind(format!("%{}%", pattern.trim_matches('%')));
                continue;
            }
        }
        push_value(builder, &filter.value);
    }
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: &SqlValue) {
    match value {
        SqlValue::Int(v) => builder.push_bind(*v),
        SqlValue::Text(v) => builder.push_bind(v.clone()),
        SqlValue::Bool(v) => builder.push_bind(*v),
        SqlValue::Timestamp(v) => builder.push_bind(*v),
        SqlValue::Json(v) => builder.push_bind(v.clone()),
        SqlValue::Null => builder.push("NULL"),
    };
}

fn decode_column(row: &PgRow, index: usize) -> StoreResult<SqlValue> {
    let column = row
        .columns()
        .get(index)
        .ok_or_else(|| PersistenceError::Database(format!("missing column at index {index}")))?;

    let value = match column.type_info().name() {
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|v| SqlValue::Int(v as i64)),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map(|v| SqlValue::Int(v as i64)),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(SqlValue::Int),
        "TEXT" | "VARCHAR" | "BPCHAR" => {
            row.try_get::<Option<String>, _>(index)?.map(SqlValue::Text)
        }
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(SqlValue::Bool),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map(SqlValue::Timestamp),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)?
            .map(SqlValue::Json),
        other => {
            return Err(PersistenceError::Database(format!(
                "unsupported column type {other} for {}",
                column.name()
            )))
        }
    };

    Ok(value.unwrap_or(SqlValue::Null))
}

/// Postgres [`DocumentStore`] over the `documents` JSONB collection table
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: i64) -> StoreResult<Option<StoredDocument>> {
        let row = sqlx::query("SELECT body, version FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(StoredDocument {
                body: row.try_get("body")?,
                version: row.try_get("version")?,
            })),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        collection: &str,
        id: i64,
        body: serde_json::Value,
        expected_version: Option<i64>,
    ) -> StoreResult<i64> {
        match expected_version {
            None => {
                let row = sqlx::query(
                    "INSERT INTO documents (collection, id, version, body) \
                     VALUES ($1, $2, 1, $3) \
                     ON CONFLICT (collection, id) \
                     DO UPDATE SET body = EXCLUDED.body, version = documents.version + 1 \
                     RETURNING version",
                )
                .bind(collection)
                .bind(id)
                .bind(body)
                .fetch_one(&self.pool)
                .await?;
                Ok(row.try_get("version")?)
            }
            Some(0) => {
                let row = sqlx::query(
                    "INSERT INTO documents (collection, id, version, body) \
                     VALUES ($1, $2, 1, $3) RETURNING version",
                )
                .bind(collection)
                .bind(id)
                .bind(body)
                .fetch_one(&self.pool)
                .await?;
                Ok(row.try_get("version")?)
            }
            Some(expected) => {
                let row = sqlx::query(
                    "UPDATE documents SET body = $3, version = version + 1 \
                     WHERE collection = $1 AND id = $2 AND version = $4 \
                     RETURNING version",
                )
                .bind(collection)
                .bind(id)
                .bind(body)
                .bind(expected)
                .fetch_optional(&self.pool)
                .await?;
                match row {
                    Some(row) => Ok(row.try_get("version")?),
                    None => Err(PersistenceError::ConcurrencyConflict(format!(
                        "document {collection}/{id} no longer at version {expected}"
                    ))),
                }
            }
        }
    }

    async fn delete(&self, collection: &str, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
