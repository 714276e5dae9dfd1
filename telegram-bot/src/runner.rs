//! Process wiring: stores, manager, health check, shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bot_runtime::{BotManager, BotWorker, RuntimeError, TransportConnector};
use dbot_telegram::TelegramConnector;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::personalities::personality_for;
use crate::stores::AppStores;

/// Registers one worker per configured bot, all sharing `connector`.
pub fn build_manager(
    config: &AppConfig,
    stores: &AppStores,
    connector: Arc<dyn TransportConnector>,
) -> Result<BotManager, RuntimeError> {
    let mut manager = BotManager::new();
    for bot in &config.bots {
        let worker = BotWorker::new(
            bot.worker_config(),
            personality_for(&bot.name, stores),
            connector.clone(),
            config.retry.clone(),
        );
        manager.register(worker)?;
        info!(bot = %bot.name, admins = bot.admin_ids.len(), "Bot created");
    }
    Ok(manager)
}

/// Calls [`BotManager::health_check`] every `interval`. The first check runs one interval after start.
pub fn spawn_health_check(manager: Arc<Mutex<BotManager>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            manager.lock().await.health_check().await;
        }
    })
}

/// Starts every bot, then blocks until Ctrl-C or SIGTERM and shuts down.
///
/// Fails when no bot could be started.
#[instrument(skip(config, connector), fields(bots = config.bots.len()))]
pub async fn run(config: AppConfig, connector: Arc<dyn TransportConnector>) -> Result<()> {
    let stores = AppStores::open(config.notes_path(), config.questions_path()).await?;
    let mut manager = build_manager(&config, &stores, connector)?;

    info!(total = config.bots.len(), "Starting bot system");
    let failures = manager.start_all().await;
    for (name, err) in &failures {
        error!(bot = %name, error = %err, "Bot failed to start");
    }
    let status = manager.status();
    if status.running_bots == 0 {
        manager.stop_all().await;
        anyhow::bail!("None of the {} configured bots could be started", status.total_bots);
    }
    info!(
        running = status.running_bots,
        total = status.total_bots,
        "Bot system started"
    );

    let manager = Arc::new(Mutex::new(manager));
    let health = spawn_health_check(manager.clone(), config.health_check_interval);

    shutdown_signal().await;
    info!("Shutdown requested");

    manager.lock().await.stop_all().await;
    health.abort();
    let _ = health.await;

    info!("Bot system stopped");
    Ok(())
}

/// Entry point for `run`: Telegram transport with the configured API endpoint.
pub async fn run_telegram(config: AppConfig) -> Result<()> {
    let connector = Arc::new(TelegramConnector::new(config.api_url.clone()));
    run(config, connector).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// What `check-config` prints per bot.
#[derive(Debug, Serialize)]
pub struct BotSummary {
    pub name: String,
    pub token: String,
    pub admin_ids: Vec<i64>,
    pub extra: Vec<String>,
}

pub fn summarize(config: &AppConfig) -> Vec<BotSummary> {
    config
        .bots
        .iter()
        .map(|bot| BotSummary {
            name: bot.name.clone(),
            token: bot.masked_token(),
            admin_ids: bot.admin_ids.clone(),
            extra: bot.extra.keys().cloned().collect(),
        })
        .collect()
}
