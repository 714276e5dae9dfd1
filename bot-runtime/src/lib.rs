//! Bot runtime: worker lifecycle, connect retry, metrics and the multi-bot manager.
//!
//! ## Modules
//!
//! - [`transport`] – TransportConnector / Connection seam
//! - [`retry`] – RetryPolicy and connect_with_retry (tokio-retry)
//! - [`worker`] – BotWorker state machine, dispatch loop, error boundary
//! - [`manager`] – BotManager registry and health check
//! - [`metrics`] – counters, WorkerMetrics, MeteredBot
//! - [`personality`] – BotPersonality trait
//! - [`state`] – StateManager for conversation state

mod error;
mod manager;
mod metrics;
mod personality;
mod retry;
mod state;
mod transport;
mod worker;

pub use error::{Result, RuntimeError, TransportError};
pub use manager::{BotManager, ManagerStatus};
pub use metrics::{Counters, MeteredBot, WorkerMetrics};
pub use personality::BotPersonality;
pub use retry::{connect_with_retry, RetryPolicy};
pub use state::StateManager;
pub use transport::{Connection, TransportConnector};
pub use worker::{BotWorker, WorkerConfig, WorkerState};
