//! Storage error taxonomy
//!
//! Not-found is never an error at repository call sites; repositories
//! return `Option`/`bool` for missing rows and documents. Everything that
//! actually went wrong at the store boundary is a [`PersistenceError`].

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, PersistenceError>;

/// Store-level failure
///
/// `ConcurrencyConflict` is kept as a distinguished variant so callers can
/// decide between retrying the operation and surfacing the conflict.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("concurrent modification detected: {0}")]
    ConcurrencyConflict(String),

    #[error("connection failure: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no transaction is active")]
    NoActiveTransaction,

    #[error("unexpected row shape for table {0}")]
    RowShape(&'static str),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                if let Some(code) = db.code() {
                    // 40001 = serialization_failure, 40P01 = deadlock_detected
                    if code == "40001" || code == "40P01" {
                        return PersistenceError::ConcurrencyConflict(db.message().to_string());
                    }
                    // Class 23 = integrity constraint violation
                    if code.starts_with("23") {
                        return PersistenceError::Constraint(db.message().to_string());
                    }
                }
                PersistenceError::Database(db.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => PersistenceError::Connection(err.to_string()),
            _ => PersistenceError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_map_to_connection() {
        let err: PersistenceError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, PersistenceError::Connection(_)));
    }

    #[test]
    fn test_row_not_found_maps_to_database() {
        let err: PersistenceError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, PersistenceError::Database(_)));
    }
}
