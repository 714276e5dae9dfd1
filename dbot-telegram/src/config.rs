//! Transport configuration: optional Bot API endpoint override.
//! Loaded from TELEGRAM_API_URL (or TELOXIDE_API_URL).

use std::env;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelegramConfig {
    pub api_url: Option<String>,
}

impl TelegramConfig {
    pub fn from_env() -> Self {
        let api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok()
            .filter(|s| !s.trim().is_empty());
        Self { api_url }
    }

    /// Parsed endpoint. An unparsable value is an error rather than a silent fallback.
    pub fn api_url(&self) -> Result<Option<reqwest::Url>, String> {
        self.api_url
            .as_deref()
            .map(|raw| {
                reqwest::Url::parse(raw).map_err(|e| format!("Invalid TELEGRAM_API_URL {}: {}", raw, e))
            })
            .transpose()
    }
}
