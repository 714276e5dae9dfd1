use async_trait::async_trait;
use dbot_core::{BotContext, Handler, HandlerResponse, Message, Result};
use tracing::{debug, info};

/// Logs every inbound update before the chain runs and the outcome afterwards. Never stops the chain.
pub struct LoggingHandler;

#[async_trait]
impl Handler for LoggingHandler {
    async fn before(&self, ctx: &BotContext, message: &Message) -> Result<bool> {
        info!(
            bot = %ctx.bot_name,
            user_id = message.user.id,
            chat_id = message.chat.id,
            kind = ?message.kind,
            message_content = %message.content,
            "Received update"
        );
        Ok(true)
    }

    async fn after(&self, ctx: &BotContext, message: &Message, response: &HandlerResponse) -> Result<()> {
        debug!(
            bot = %ctx.bot_name,
            user_id = message.user.id,
            response = ?response,
            "Update handled"
        );
        Ok(())
    }
}
