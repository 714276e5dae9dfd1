//! Bot personalities, selected by bot name.
//!
//! - `glasspen` – channel feedback: FAQ, questions for the author, admin answers
//! - `helper` – personal notes
//! - anything else – [`BasicPersonality`]

mod basic;
mod glasspen;
mod helper;
mod logging;

use std::sync::Arc;

use bot_runtime::BotPersonality;
use tracing::warn;

use crate::stores::AppStores;

pub use basic::BasicPersonality;
pub use glasspen::{main_menu_keyboard, GlasspenPersonality, DEFAULT_CHANNEL_LINK, PENDING_LIMIT};
pub use helper::{HelperPersonality, LIST_LIMIT};
pub use logging::LoggingHandler;

/// Shown when a store operation fails; details go to the log.
pub const FAILURE_TEXT: &str = "❌ Something went wrong. Please try again later.";

pub fn personality_for(name: &str, stores: &AppStores) -> Arc<dyn BotPersonality> {
    match name {
        "glasspen" => Arc::new(GlasspenPersonality::new(stores.questions.clone())),
        "helper" => Arc::new(HelperPersonality::new(stores.notes.clone())),
        other => {
            warn!(bot = %other, "Unknown bot type, using the basic personality");
            Arc::new(BasicPersonality)
        }
    }
}

/// First `max` characters, with `...` appended when something was cut.
pub(crate) fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
