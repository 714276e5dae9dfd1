//! Outbound side of a bot: sending and editing messages.
//!
//! [`Bot`] is transport-agnostic; dbot-telegram implements it over teloxide and tests substitute
//! recording mocks. Messages carry [`SendOptions`] (text format + optional inline keyboard).

use crate::error::{DbotError, Result};
use crate::types::{Chat, Message};
use async_trait::async_trait;

/// How the transport should interpret the text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextFormat {
    #[default]
    Plain,
    /// Telegram HTML subset; callers escape user-provided text.
    Html,
}

/// One inline keyboard button carrying callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Rows of inline buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row of buttons.
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    /// Appends a single-button row.
    pub fn button(self, text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        self.row(vec![InlineButton::callback(text, callback_data)])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.is_empty())
    }
}

/// Per-message send options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub format: TextFormat,
    pub keyboard: Option<InlineKeyboard>,
}

impl SendOptions {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn html() -> Self {
        Self {
            format: TextFormat::Html,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Abstraction for sending and editing messages. Implementations map to a transport (e.g. Telegram).
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends `text` to `chat_id` and returns the transport message id.
    async fn send(&self, chat_id: i64, text: &str, options: &SendOptions) -> Result<String>;

    /// Edits an already-sent message. `message_id` is transport-specific (Telegram numeric string).
    async fn edit(
        &self,
        chat_id: i64,
        message_id: &str,
        text: &str,
        options: &SendOptions,
    ) -> Result<()>;

    /// Sends a plain text message to the given chat.
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.send(chat.id, text, &SendOptions::plain()).await.map(|_| ())
    }

    /// Sends a reply into the chat the message came from.
    async fn reply_to(&self, message: &Message, text: &str) -> Result<()> {
        self.send_message(&message.chat, text).await
    }

    /// Sends a reply with options into the chat the message came from.
    async fn reply_with(&self, message: &Message, text: &str, options: &SendOptions) -> Result<()> {
        self.send(message.chat.id, text, options).await.map(|_| ())
    }
}

/// Parses a message id string into an i32. Used by transports implementing `edit`.
pub fn parse_message_id(s: &str) -> Result<i32> {
    s.parse()
        .map_err(|_| DbotError::Bot(format!("Invalid message_id for edit: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_id_valid() {
        assert_eq!(parse_message_id("123").unwrap(), 123);
        assert_eq!(parse_message_id("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_message_id_invalid() {
        assert!(parse_message_id("").is_err());
        assert!(parse_message_id("abc").is_err());
        assert!(parse_message_id("12.3").is_err());
    }

    #[test]
    fn test_keyboard_builder() {
        let keyboard = InlineKeyboard::new()
            .button("FAQ", "show_faq")
            .row(vec![
                InlineButton::callback("Back", "main_menu"),
                InlineButton::callback("Cancel", "cancel"),
            ]);
        assert_eq!(keyboard.rows.len(), 2);
        assert_eq!(keyboard.rows[1][1].callback_data, "cancel");
        assert!(!keyboard.is_empty());
        assert!(InlineKeyboard::new().is_empty());
    }

    #[test]
    fn test_send_options() {
        let opts = SendOptions::html().with_keyboard(InlineKeyboard::new().button("a", "b"));
        assert_eq!(opts.format, TextFormat::Html);
        assert!(opts.keyboard.is_some());
        assert_eq!(SendOptions::plain().format, TextFormat::Plain);
    }
}
