//! Transport seam between the worker and a messaging backend.
//!
//! A [`TransportConnector`] validates a credential and yields a [`Connection`]; the connection
//! exposes the outbound [`Bot`] and, once opened, pushes inbound updates into an mpsc sender.
//! Dropping that sender (polling ended) is how a connection reports a dead stream.

use std::sync::Arc;

use async_trait::async_trait;
use dbot_core::{Bot, Message};
use tokio::sync::mpsc;

use crate::error::TransportError;

#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Connects with `credential` (e.g. a bot token). Called once per start attempt.
    async fn connect(&self, credential: &str) -> Result<Box<dyn Connection>, TransportError>;
}

#[async_trait]
pub trait Connection: Send + Sync {
    /// Outbound handle for this connection.
    fn bot(&self) -> Arc<dyn Bot>;

    /// Starts receiving; every inbound update is sent to `sink` until [`close`](Self::close).
    async fn open(&mut self, sink: mpsc::Sender<Message>) -> Result<(), TransportError>;

    /// Stops receiving and releases the transport.
    async fn close(&mut self) -> Result<(), TransportError>;
}
