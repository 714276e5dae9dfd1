//! Bot discovery from `BOT_<NAME>_<KEY>` variables.

use std::collections::BTreeMap;

use bot_runtime::WorkerConfig;
use tracing::info;

use super::error::ConfigError;

const PREFIX: &str = "BOT_";

/// One configured bot, as read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSettings {
    /// Lower-cased `<NAME>` segment.
    pub name: String,
    pub token: String,
    pub admin_ids: Vec<i64>,
    /// Every other key, lower-cased.
    pub extra: BTreeMap<String, String>,
}

impl BotSettings {
    pub fn masked_token(&self) -> String {
        mask_token(&self.token)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            name: self.name.clone(),
            credential: self.token.clone(),
            admin_ids: self.admin_ids.clone(),
            extra: self.extra.clone(),
        }
    }
}

#[derive(Default)]
struct RawBot {
    token: Option<String>,
    admin_ids: Option<String>,
    extra: BTreeMap<String, String>,
}

/// Groups `BOT_<NAME>_<KEY>` variables by bot and validates them. Other variables are ignored.
///
/// Disabled bots are dropped before validation. Returned bots are sorted by name.
pub fn discover_bots<I>(vars: I) -> Result<Vec<BotSettings>, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut raw: BTreeMap<String, RawBot> = BTreeMap::new();
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(PREFIX) else {
            continue;
        };
        let Some((name, field)) = rest.split_once('_') else {
            continue;
        };
        if name.is_empty() || field.is_empty() {
            continue;
        }
        let entry = raw.entry(name.to_lowercase()).or_default();
        match field {
            "TOKEN" => entry.token = Some(value),
            "ADMIN_IDS" => entry.admin_ids = Some(value),
            other => {
                entry.extra.insert(other.to_lowercase(), value);
            }
        }
    }

    let mut bots = Vec::with_capacity(raw.len());
    for (name, bot) in raw {
        if !is_enabled(&bot.extra) {
            info!(bot = %name, "Bot disabled in configuration, skipping");
            continue;
        }
        let token = bot
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingToken { bot: name.clone() })?;
        if !token.contains(':') {
            return Err(ConfigError::MalformedToken { bot: name });
        }
        let admin_ids = match bot.admin_ids {
            Some(value) => parse_admin_ids(&value).ok_or(ConfigError::InvalidAdminIds {
                bot: name.clone(),
                value,
            })?,
            None => Vec::new(),
        };
        bots.push(BotSettings {
            name,
            token,
            admin_ids,
            extra: bot.extra,
        });
    }
    Ok(bots)
}

/// `[1, 2]` or `1,2`. Blank input means no admins.
pub fn parse_admin_ids(value: &str) -> Option<Vec<i64>> {
    let value = value.trim();
    if value.is_empty() {
        return Some(Vec::new());
    }
    if value.starts_with('[') {
        return serde_json::from_str(value).ok();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

/// `1234567890:ABCdefGHIjkl` -> `12345...HIjkl`. Short tokens are fully hidden.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 10 {
        return "***".to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{}...{}", head, tail)
}

/// `enabled` extra; anything but false/0/no/off keeps the bot on.
fn is_enabled(extra: &BTreeMap<String, String>) -> bool {
    extra
        .get("enabled")
        .map(|v| {
            !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "false" | "0" | "no" | "off"
            )
        })
        .unwrap_or(true)
}
