//! Per-bot behaviour plugged into a [`BotWorker`](crate::BotWorker).

use std::sync::Arc;

use async_trait::async_trait;
use dbot_core::{BotContext, Handler};

/// What makes one bot different from another: its context setup and its handlers.
#[async_trait]
pub trait BotPersonality: Send + Sync {
    /// Called on every start, before handlers are collected. Fill in typed context fields here.
    async fn setup(&self, _ctx: &mut BotContext) -> dbot_core::Result<()> {
        Ok(())
    }

    /// Handlers in priority order.
    fn get_handlers(&self, ctx: &BotContext) -> Vec<Arc<dyn Handler>>;
}
