//! Process-level configuration. Loaded from env after `.env` has been read.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bot_runtime::RetryPolicy;
use dbot_telegram::TelegramConfig;

use super::bots::{discover_bots, BotSettings};
use super::error::ConfigError;

pub const DEFAULT_LOG_FILE: &str = "logs/bot_system.log";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// LOG_FILE
    pub log_file: PathBuf,
    /// DATA_DIR; holds notes.json and questions.json
    pub data_dir: PathBuf,
    /// HEALTH_CHECK_INTERVAL_SECS
    pub health_check_interval: Duration,
    /// CONNECT_TIMEOUT_SECS, CONNECT_MAX_ATTEMPTS, CONNECT_BACKOFF_MS
    pub retry: RetryPolicy,
    /// TELEGRAM_API_URL or TELOXIDE_API_URL
    pub api_url: Option<reqwest::Url>,
    /// Enabled bots, sorted by name.
    pub bots: Vec<BotSettings>,
}

impl AppConfig {
    /// Fails on malformed values and when no bot is enabled.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        let health_secs: u64 = parse_env("HEALTH_CHECK_INTERVAL_SECS", 60, "a positive integer")?;
        let timeout_secs: u64 = parse_env("CONNECT_TIMEOUT_SECS", 10, "a positive integer")?;
        let max_attempts: usize = parse_env("CONNECT_MAX_ATTEMPTS", 3, "a positive integer")?;
        let backoff_ms: u64 = parse_env("CONNECT_BACKOFF_MS", 1000, "an integer")?;

        for (key, value) in [
            ("HEALTH_CHECK_INTERVAL_SECS", health_secs),
            ("CONNECT_TIMEOUT_SECS", timeout_secs),
            ("CONNECT_MAX_ATTEMPTS", max_attempts as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    expected: "a positive integer",
                    value: "0".to_string(),
                });
            }
        }

        let api_url = TelegramConfig::from_env()
            .api_url()
            .map_err(ConfigError::InvalidApiUrl)?;

        let bots = discover_bots(env::vars())?;
        if bots.is_empty() {
            return Err(ConfigError::NoBots);
        }

        Ok(Self {
            log_file: Self::log_file_from_env(),
            data_dir: PathBuf::from(data_dir),
            health_check_interval: Duration::from_secs(health_secs),
            retry: RetryPolicy {
                max_attempts,
                base_backoff: Duration::from_millis(backoff_ms),
                connect_timeout: Duration::from_secs(timeout_secs),
                ..RetryPolicy::default()
            },
            api_url,
            bots,
        })
    }

    /// LOG_FILE on its own, so logging can start before the rest of the config is validated.
    pub fn log_file_from_env() -> PathBuf {
        PathBuf::from(env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string()))
    }

    pub fn notes_path(&self) -> PathBuf {
        self.data_dir.join("notes.json")
    }

    pub fn questions_path(&self) -> PathBuf {
        self.data_dir.join("questions.json")
    }
}

fn parse_env<T: FromStr>(key: &str, default: T, expected: &'static str) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}
