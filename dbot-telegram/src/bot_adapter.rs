//! Wraps teloxide::Bot and implements [`dbot_core::Bot`]. Production code sends messages via Telegram; tests can substitute another Bot impl.

use async_trait::async_trait;
use dbot_core::{parse_message_id, Bot as CoreBot, DbotError, InlineKeyboard, Result, SendOptions, TextFormat};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};

/// Thin wrapper around teloxide::Bot that implements dbot-core's Bot trait.
pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
}

impl TelegramBotAdapter {
    /// Creates an adapter from an existing teloxide Bot.
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

fn markup(keyboard: &InlineKeyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.text.clone(), b.callback_data.clone()))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl CoreBot for TelegramBotAdapter {
    async fn send(&self, chat_id: i64, text: &str, options: &SendOptions) -> Result<String> {
        let mut request = self.bot.send_message(ChatId(chat_id), text.to_string());
        if options.format == TextFormat::Html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = options.keyboard.as_ref().filter(|k| !k.is_empty()) {
            request = request.reply_markup(markup(keyboard));
        }
        let sent = request.await.map_err(DbotError::bot)?;
        Ok(sent.id.to_string())
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: &str,
        text: &str,
        options: &SendOptions,
    ) -> Result<()> {
        let id = parse_message_id(message_id)?;
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(id), text.to_string());
        if options.format == TextFormat::Html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = options.keyboard.as_ref().filter(|k| !k.is_empty()) {
            request = request.reply_markup(markup(keyboard));
        }
        request.await.map_err(DbotError::bot)?;
        Ok(())
    }
}
