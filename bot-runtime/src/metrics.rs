//! Worker counters and the metrics snapshot the manager reports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dbot_core::{Bot, Result, SendOptions};
use serde::Serialize;

use crate::worker::WorkerState;

/// Live counters shared by the worker, its dispatch tasks and its [`MeteredBot`].
#[derive(Debug, Default)]
pub struct Counters {
    messages_processed: AtomicU64,
    commands_processed: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    pub fn record_message(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    pub fn commands_processed(&self) -> u64 {
        self.commands_processed.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerMetrics {
    pub name: String,
    pub state: WorkerState,
    pub is_running: bool,
    pub messages_processed: u64,
    pub commands_processed: u64,
    pub errors: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub uptime_secs: Option<i64>,
}

/// Outbound [`Bot`] that counts every successfully sent message.
pub struct MeteredBot {
    inner: Arc<dyn Bot>,
    counters: Arc<Counters>,
}

impl MeteredBot {
    pub fn new(inner: Arc<dyn Bot>, counters: Arc<Counters>) -> Self {
        Self { inner, counters }
    }
}

#[async_trait]
impl Bot for MeteredBot {
    async fn send(&self, chat_id: i64, text: &str, options: &SendOptions) -> Result<String> {
        let id = self.inner.send(chat_id, text, options).await?;
        self.counters.record_message();
        Ok(id)
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: &str,
        text: &str,
        options: &SendOptions,
    ) -> Result<()> {
        self.inner.edit(chat_id, message_id, text, options).await
    }
}
