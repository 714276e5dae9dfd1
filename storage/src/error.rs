//! Storage error types.
//!
//! Used by the record stores and propagated to the handlers that call them.

use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Short id '{prefix}' matches {matches} records")]
    AmbiguousId { prefix: String, matches: usize },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
