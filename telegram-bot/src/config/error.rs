use thiserror::Error;

/// Startup configuration problems. All of them are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BOT_{}_TOKEN is not set", .bot.to_uppercase())]
    MissingToken { bot: String },

    #[error("BOT_{}_TOKEN is malformed, expected <id>:<secret>", .bot.to_uppercase())]
    MalformedToken { bot: String },

    #[error(
        "BOT_{}_ADMIN_IDS must be a JSON integer array or comma-separated integers, got {value:?}",
        .bot.to_uppercase()
    )]
    InvalidAdminIds { bot: String, value: String },

    #[error("{key} must be {expected}, got {value:?}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        value: String,
    },

    #[error("Invalid Telegram API URL: {0}")]
    InvalidApiUrl(String),

    #[error("No bots configured, set BOT_<NAME>_TOKEN")]
    NoBots,
}
