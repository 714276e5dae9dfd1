//! Manager wiring: one worker per configured bot, personalities by name, health-check task.

mod common;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bot_runtime::{BotManager, RetryPolicy};
use common::{next_outbound, text, LocalConnector};
use telegram_bot::{build_manager, spawn_health_check, summarize, AppConfig, AppStores, BotSettings};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio_test::assert_ok;

fn bot(name: &str, token: &str) -> BotSettings {
    BotSettings {
        name: name.to_string(),
        token: token.to_string(),
        admin_ids: vec![1],
        extra: BTreeMap::new(),
    }
}

fn app_config(dir: &TempDir, bots: Vec<BotSettings>) -> AppConfig {
    AppConfig {
        log_file: PathBuf::from("logs/test.log"),
        data_dir: dir.path().to_path_buf(),
        health_check_interval: Duration::from_millis(50),
        retry: RetryPolicy {
            max_attempts: 1,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            connect_timeout: Duration::from_millis(500),
        },
        api_url: None,
        bots,
    }
}

async fn stores(config: &AppConfig) -> AppStores {
    AppStores::open(config.notes_path(), config.questions_path())
        .await
        .unwrap()
}

/// **Test: Every configured bot gets a worker running its own personality.**
///
/// **Setup:** helper, glasspen and an unknown `echo` bot on a local connector.
///
/// **Action:** start_all, then `/start` injected into each bot's stream.
///
/// **Expected:** All three run; each answers with its own greeting.
#[tokio::test]
async fn test_bots_run_their_personalities() {
    let dir = tempfile::tempdir().unwrap();
    let config = app_config(
        &dir,
        vec![
            bot("echo", "3:echo"),
            bot("glasspen", "2:glass"),
            bot("helper", "1:helper"),
        ],
    );
    let (connector, mut sent) = LocalConnector::new();
    let mut manager = assert_ok!(build_manager(&config, &stores(&config).await, connector.clone()));
    assert_eq!(manager.names(), vec!["echo", "glasspen", "helper"]);

    assert!(manager.start_all().await.is_empty());
    assert_eq!(manager.status().running_bots, 3);

    assert!(connector.inject("1:helper", text(42, "/start")).await);
    let reply = next_outbound(&mut sent).await.expect("helper reply");
    assert!(reply.text.contains("I keep your notes"));

    assert!(connector.inject("2:glass", text(42, "/start")).await);
    let reply = next_outbound(&mut sent).await.expect("glasspen reply");
    assert!(reply.text.contains("Glass Pen"));

    assert!(connector.inject("3:echo", text(42, "/start")).await);
    let reply = next_outbound(&mut sent).await.expect("basic reply");
    assert!(reply.text.contains("I am echo"));

    manager.stop_all().await;
    assert_eq!(manager.status().running_bots, 0);
}

/// **Test: A rejected token fails only its own bot.**
#[tokio::test]
async fn test_rejected_bot_does_not_block_others() {
    let dir = tempfile::tempdir().unwrap();
    let config = app_config(&dir, vec![bot("broken", "0:bad"), bot("helper", "1:helper")]);
    let (connector, _sent) = LocalConnector::new();
    let mut manager = build_manager(&config, &stores(&config).await, connector).unwrap();

    let failures = manager.start_all().await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "broken");
    assert!(manager.get("helper").unwrap().is_running());
    assert!(!manager.get("broken").unwrap().is_running());
    manager.stop_all().await;
}

/// **Test: The health-check task restarts a bot whose first start failed.**
///
/// **Setup:** The connector rejects the very first connect.
///
/// **Action:** start_all (fails), then spawn the health check with a 50 ms interval.
///
/// **Expected:** Within a second the bot is running; aborting the task completes.
#[tokio::test]
async fn test_health_check_task_restarts_failed_bot() {
    let dir = tempfile::tempdir().unwrap();
    let config = app_config(&dir, vec![bot("helper", "1:helper")]);
    let (connector, _sent) = LocalConnector::rejecting_first(1);
    let mut manager = build_manager(&config, &stores(&config).await, connector).unwrap();
    assert_eq!(manager.start_all().await.len(), 1);

    let manager: Arc<Mutex<BotManager>> = Arc::new(Mutex::new(manager));
    let health = spawn_health_check(manager.clone(), config.health_check_interval);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while manager.lock().await.status().running_bots == 0 {
        assert!(tokio::time::Instant::now() < deadline, "bot was not restarted");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    manager.lock().await.stop_all().await;
    health.abort();
    assert!(health.await.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn test_duplicate_bot_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = app_config(&dir, vec![bot("helper", "1:a"), bot("helper", "2:b")]);
    let (connector, _sent) = LocalConnector::new();

    assert!(build_manager(&config, &stores(&config).await, connector).is_err());
}

#[test]
fn test_summary_masks_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = bot("glasspen", "1234567890:ABCdefGHIjkl");
    settings.extra.insert("admin_chat_id".to_string(), "-100".to_string());
    let config = app_config(&dir, vec![settings]);

    let summary = summarize(&config);

    assert_eq!(summary[0].token, "12345...HIjkl");
    assert_eq!(summary[0].extra, vec!["admin_chat_id"]);
    let json = serde_json::to_string(&summary).unwrap();
    assert!(!json.contains("ABCdefGHIjkl"));
}
