//! BookCross Common Library
//!
//! Shared types, utilities, and error handling for the BookCross backend.
//!
//! # Overview
//!
//! This crate provides common functionality used across all BookCross
//! workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized `tracing` setup with console/file output
//! - **Types**: Pagination request and result shapes
//!
//! # Example
//!
//! ```no_run
//! use bookcross_common::{Result, BookCrossError};
//!
//! fn load_setting(name: &str) -> Result<String> {
//!     std::env::var(name).map_err(|_| BookCrossError::Config(name.to_string()))
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{BookCrossError, Result};
