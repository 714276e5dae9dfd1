//! Fallback for bots without a dedicated personality: greets and explains itself.

use std::sync::Arc;

use async_trait::async_trait;
use bot_runtime::BotPersonality;
use dbot_core::{BotContext, Handler, HandlerResponse, Message, Result};

use super::logging::LoggingHandler;

pub struct BasicPersonality;

#[async_trait]
impl BotPersonality for BasicPersonality {
    fn get_handlers(&self, _ctx: &BotContext) -> Vec<Arc<dyn Handler>> {
        vec![Arc::new(LoggingHandler), Arc::new(BasicHandler)]
    }
}

struct BasicHandler;

#[async_trait]
impl Handler for BasicHandler {
    async fn handle(&self, ctx: &BotContext, message: &Message) -> Result<HandlerResponse> {
        let Some(command) = message.command() else {
            return Ok(HandlerResponse::Ignore);
        };
        let reply = match command.name.as_str() {
            "start" => format!(
                "👋 Hi, {}! I am {}.\n\nSend /help to see what I can do.",
                message.user.display_name(),
                ctx.bot_name
            ),
            "help" => "🆘 Available commands:\n/start - greeting\n/help - this help".to_string(),
            _ => return Ok(HandlerResponse::Ignore),
        };
        Ok(HandlerResponse::Reply(reply))
    }
}
