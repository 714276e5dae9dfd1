//! Runtime error types: transport failures (classified for retry) and worker/manager errors.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by a transport while connecting, opening or closing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Credential rejected: {0}")]
    Rejected(String),
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Only timeout-class failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Errors from [`BotWorker`](crate::BotWorker) and [`BotManager`](crate::BotManager).
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Bot {0} is not running")]
    NotRunning(String),

    #[error("Bot {0} is already registered")]
    DuplicateName(String),

    #[error("Bot {0} not found")]
    NotFound(String),

    #[error("Bot {name} failed to start: {source}")]
    StartFailed {
        name: String,
        #[source]
        source: TransportError,
    },

    #[error("Bot {name} setup failed: {message}")]
    Setup { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
