//! Error types shared across the BookCross backend

use thiserror::Error;

/// Result type alias for BookCross operations
pub type Result<T> = std::result::Result<T, BookCrossError>;

/// Main error type for cross-cutting concerns
///
/// Storage-specific failures have their own taxonomy in the store crate;
/// this type covers everything the workspace members share.
#[derive(Error, Debug)]
pub enum BookCrossError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
