//! Entity metadata for the generic relational repository
//!
//! An [`Entity`] describes how a record type maps onto a relational table:
//! its table name, column list, and how a row converts to and from the
//! backend-neutral [`SqlValue`] representation. The generic repository and
//! the pagination service are written entirely against this metadata, so
//! the same code path serves every entity type.

use chrono::{DateTime, Utc};

use crate::error::PersistenceError;

/// Backend-neutral column value
///
/// The small set of scalar types the BookCross schema actually uses. Both
/// the Postgres backend and the in-memory backend bind and decode through
/// this representation.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    Null,
}

impl SqlValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            SqlValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Total order used by the in-memory backend for sorting. Values of
    /// mismatched types compare equal; `Null` sorts first, as in Postgres
    /// with `NULLS FIRST`.
    pub fn compare(&self, other: &SqlValue) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (SqlValue::Null, SqlValue::Null) => Ordering::Equal,
            (SqlValue::Null, _) => Ordering::Less,
            (_, SqlValue::Null) => Ordering::Greater,
            (SqlValue::Int(a), SqlValue::Int(b)) => a.cmp(b),
            (SqlValue::Text(a), SqlValue::Text(b)) => a.cmp(b),
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a.cmp(b),
            (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) => SqlValue::Text(v),
            None => SqlValue::Null,
        }
    }
}

/// Relational entity metadata
///
/// `columns()` and `values()` are parallel sequences: `values()[i]` is the
/// value of `columns()[i]`. Identifiers are caller-assigned (the original
/// schema never generates them), so `values()` includes the key columns.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Table this entity maps to
    const TABLE: &'static str;

    /// Primary key column, used as the stable ordering fallback
    const ID_COLUMN: &'static str = "id";

    /// Column list, in declaration order
    fn columns() -> &'static [&'static str];

    /// Row values, parallel to `columns()`
    fn values(&self) -> Vec<SqlValue>;

    /// Reconstruct an entity from a row in `columns()` order
    fn from_values(values: &[SqlValue]) -> Result<Self, PersistenceError>;

    /// Primary key columns and their values
    ///
    /// Single-column integer keys are the common case; association rows
    /// override this with their composite key.
    fn key(&self) -> Vec<(&'static str, SqlValue)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_sql_value_accessors() {
        assert_eq!(SqlValue::Int(7).as_int(), Some(7));
        assert_eq!(SqlValue::Text("x".into()).as_text(), Some("x"));
        assert_eq!(SqlValue::Bool(true).as_bool(), Some(true));
        assert_eq!(SqlValue::Null.as_int(), None);
        assert!(SqlValue::Null.is_null());
    }

    #[test]
    fn test_sql_value_ordering() {
        assert_eq!(SqlValue::Int(1).compare(&SqlValue::Int(2)), Ordering::Less);
        assert_eq!(
            SqlValue::Text("b".into()).compare(&SqlValue::Text("a".into())),
            Ordering::Greater
        );
        assert_eq!(SqlValue::Null.compare(&SqlValue::Int(0)), Ordering::Less);
        assert_eq!(SqlValue::Int(1).compare(&SqlValue::Bool(true)), Ordering::Equal);
    }

    #[test]
    fn test_optional_text_conversion() {
        assert_eq!(SqlValue::from(Some("x".to_string())), SqlValue::Text("x".into()));
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
    }
}
