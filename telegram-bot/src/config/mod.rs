//! Application config: process settings plus per-bot `BOT_<NAME>_<KEY>` discovery.

mod app;
mod bots;
mod error;


pub use app::{AppConfig, DEFAULT_DATA_DIR, DEFAULT_LOG_FILE};
pub use bots::{discover_bots, mask_token, parse_admin_ids, BotSettings};
pub use error::ConfigError;
