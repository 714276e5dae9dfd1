//! Error types for the bot core.
//!
//! [`DbotError`] is the top-level error handlers and transports return; [`HandlerError`] covers
//! failures that originate in handler logic itself.

use thiserror::Error;

/// Top-level error for dbot (storage, bot transport, handler, config, IO).
#[derive(Error, Debug)]
pub enum DbotError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Bot error: {0}")]
    Bot(String),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbotError {
    /// Wraps any displayable storage failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// Wraps any displayable transport failure.
    pub fn bot(err: impl std::fmt::Display) -> Self {
        Self::Bot(err.to_string())
    }
}

/// Errors produced by handler logic itself.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("State error: {0}")]
    State(String),

    #[error("Empty content")]
    EmptyContent,
}

/// Result type for core operations; uses [`DbotError`].
pub type Result<T> = std::result::Result<T, DbotError>;
