//! # Telegram bot application
//!
//! Loads per-bot configuration from env, opens the shared note and question stores, and runs
//! every configured bot under one [`bot_runtime::BotManager`]. Each bot's behaviour comes from its
//! personality (`glasspen`, `helper`, or the basic fallback).

pub mod cli;
pub mod config;
pub mod personalities;
pub mod runner;
pub mod stores;

pub use cli::{Cli, Commands};
pub use config::{discover_bots, mask_token, AppConfig, BotSettings, ConfigError};
pub use personalities::{
    personality_for, BasicPersonality, GlasspenPersonality, HelperPersonality, LoggingHandler,
};
pub use runner::{build_manager, run, run_telegram, spawn_health_check, summarize, BotSummary};
pub use stores::AppStores;
