//! Registry of named workers: concurrent start/stop, restart and health check.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, RuntimeError};
use crate::metrics::WorkerMetrics;
use crate::worker::BotWorker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerStatus {
    pub manager_running: bool,
    pub total_bots: usize,
    pub running_bots: usize,
    pub uptime_secs: Option<i64>,
    pub bots: BTreeMap<String, WorkerMetrics>,
}

#[derive(Default)]
pub struct BotManager {
    workers: BTreeMap<String, BotWorker>,
    running: bool,
    started_at: Option<DateTime<Utc>>,
}

impl BotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a worker under its own name. Allowed at any time, including after `start_all`.
    pub fn register(&mut self, worker: BotWorker) -> Result<()> {
        let name = worker.name().to_string();
        if self.workers.contains_key(&name) {
            return Err(RuntimeError::DuplicateName(name));
        }
        info!(bot = %name, "Bot registered");
        self.workers.insert(name, worker);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Registered names in lexicographic order.
    pub fn names(&self) -> Vec<String> {
        self.workers.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<&BotWorker> {
        self.workers
            .get(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    /// Starts every worker concurrently. One worker failing does not affect the others;
    /// the failures are logged and returned.
    #[instrument(skip(self))]
    pub async fn start_all(&mut self) -> Vec<(String, RuntimeError)> {
        if self.running {
            warn!("Bot manager already running");
            return Vec::new();
        }
        info!(total = self.workers.len(), "Starting all bots");

        let results = join_all(self.workers.values_mut().map(|worker| async move {
            let name = worker.name().to_string();
            (name, worker.start().await)
        }))
        .await;

        let failures = collect_failures(results);
        self.running = true;
        self.started_at = Some(Utc::now());
        info!(
            running = self.running_count(),
            total = self.workers.len(),
            failed = failures.len(),
            "Bot manager started"
        );
        failures
    }

    /// Stops every worker concurrently.
    #[instrument(skip(self))]
    pub async fn stop_all(&mut self) {
        if !self.running {
            warn!("Bot manager not running");
            return;
        }
        info!(total = self.workers.len(), "Stopping all bots");
        join_all(self.workers.values_mut().map(|worker| worker.stop())).await;
        self.running = false;
        self.started_at = None;
        info!("All bots stopped");
    }

    /// Stops the worker if running, then starts it again.
    #[instrument(skip(self))]
    pub async fn restart(&mut self, name: &str) -> Result<()> {
        let worker = self
            .workers
            .get_mut(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;
        if worker.is_running() {
            worker.stop().await;
        }
        worker.start().await
    }

    /// Restarts every worker that is not running. Failures are logged; the status is always returned.
    /// Skipped while the manager itself is stopped.
    pub async fn health_check(&mut self) -> ManagerStatus {
        if self.running {
            let results = join_all(
                self.workers
                    .values_mut()
                    .filter(|worker| !worker.is_running())
                    .map(|worker| async move {
                        let name = worker.name().to_string();
                        warn!(bot = %name, state = ?worker.state(), "Bot not running; restarting");
                        (name, worker.start().await)
                    }),
            )
            .await;
            for (name, _) in collect_failures(results) {
                error!(bot = %name, "Health check restart failed");
            }
        }

        let status = self.status();
        debug!(
            running = status.running_bots,
            total = status.total_bots,
            "Health check"
        );
        status
    }

    pub fn status(&self) -> ManagerStatus {
        let bots = self.metrics();
        ManagerStatus {
            manager_running: self.running,
            total_bots: bots.len(),
            running_bots: bots.values().filter(|m| m.is_running).count(),
            uptime_secs: self.started_at.map(|t| (Utc::now() - t).num_seconds()),
            bots,
        }
    }

    pub fn metrics(&self) -> BTreeMap<String, WorkerMetrics> {
        self.workers
            .iter()
            .map(|(name, worker)| (name.clone(), worker.metrics()))
            .collect()
    }

    fn running_count(&self) -> usize {
        self.workers.values().filter(|w| w.is_running()).count()
    }
}

fn collect_failures(results: Vec<(String, Result<()>)>) -> Vec<(String, RuntimeError)> {
    results
        .into_iter()
        .filter_map(|(name, result)| match result {
            Ok(()) => None,
            Err(e) => {
                error!(bot = %name, error = %e, "Bot failed");
                Some((name, e))
            }
        })
        .collect()
}
