//! # dbot-telegram
//!
//! Telegram transport layer: adapters, [`dbot_core::Bot`] implementation, and a
//! [`bot_runtime::TransportConnector`] that long-polls through teloxide.
//! Handles only Telegram connectivity; no persistence or bot behaviour.

mod adapters;
mod bot_adapter;
mod config;
mod transport;

pub use adapters::{TelegramCallbackWrapper, TelegramMessageWrapper, TelegramUserWrapper};
pub use bot_adapter::TelegramBotAdapter;
pub use config::TelegramConfig;
pub use transport::{classify, TelegramConnection, TelegramConnector};
