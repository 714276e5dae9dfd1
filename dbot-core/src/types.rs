//! Core types: user, chat, inbound message, handler response, and the Handler trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::BotContext;

/// User identity (id, username, names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// First name, falling back to `@username`, then to the numeric id.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.username) {
            (Some(first), _) if !first.is_empty() => first.clone(),
            (_, Some(username)) if !username.is_empty() => format!("@{}", username),
            _ => self.id.to_string(),
        }
    }
}

/// Chat (private, group or channel) identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub chat_type: String,
}

/// What kind of inbound update a [`Message`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// Text starting with `/`.
    Command,
    /// Any other text message.
    Text,
    /// Inline keyboard button press; `content` holds the callback data.
    Callback,
}

/// One inbound update. For callbacks, `id` is the id of the message that carried the keyboard
/// (so handlers can edit it) and `content` is the callback data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user: User,
    pub chat: Chat,
    pub content: String,
    pub kind: UpdateKind,
    pub created_at: DateTime<Utc>,
}

/// A parsed `/command arg1 arg2` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation<'a> {
    /// Lower-cased command name without the slash or `@botname` suffix.
    pub name: String,
    pub args: Vec<&'a str>,
}

impl Message {
    /// Classifies free text as a command or plain text.
    pub fn kind_of_text(text: &str) -> UpdateKind {
        if text.starts_with('/') {
            UpdateKind::Command
        } else {
            UpdateKind::Text
        }
    }

    pub fn is_command(&self) -> bool {
        self.kind == UpdateKind::Command
    }

    /// Parses the command name and whitespace-separated arguments. `None` for non-commands.
    pub fn command(&self) -> Option<CommandInvocation<'_>> {
        if !self.is_command() {
            return None;
        }
        let mut parts = self.content.split_whitespace();
        let head = parts.next()?.trim_start_matches('/');
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        if name.is_empty() {
            return None;
        }
        Some(CommandInvocation {
            name,
            args: parts.collect(),
        })
    }

    /// True when this is the `/name` command.
    pub fn is_command_named(&self, name: &str) -> bool {
        self.command().map(|c| c.name == name).unwrap_or(false)
    }

    /// Everything after the command word, trimmed. Keeps the user's spacing inside the text.
    pub fn command_tail(&self) -> Option<&str> {
        if !self.is_command() {
            return None;
        }
        let trimmed = self.content.trim_start();
        Some(match trimmed.find(char::is_whitespace) {
            Some(idx) => trimmed[idx..].trim(),
            None => "",
        })
    }

    /// Callback data for button presses.
    pub fn callback_data(&self) -> Option<&str> {
        match self.kind {
            UpdateKind::Callback => Some(self.content.as_str()),
            _ => None,
        }
    }

    /// Plain text for non-command text messages.
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            UpdateKind::Text => Some(self.content.as_str()),
            _ => None,
        }
    }
}

/// Handler result for the chain. `Reply(text)` ends the chain and asks the worker to send `text`
/// back to the originating chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Stop the chain; no response body.
    Stop,
    /// This handler does not apply; try next.
    Ignore,
    /// Stop the chain and send this text to the chat.
    Reply(String),
}

/// Converts a transport-specific user type to core [`User`].
pub trait ToCoreUser: Send + Sync {
    fn to_core(&self) -> User;
}

/// Converts a transport-specific update type to core [`Message`].
pub trait ToCoreMessage: Send + Sync {
    fn to_core(&self) -> Message;
}

/// Single handler concept: optional before / handle / after, each receiving the worker's
/// [`BotContext`]. Chain runs all before → handle until Stop/Reply → all after (reverse).
#[async_trait]
pub trait Handler: Send + Sync {
    /// Runs before the handle phase. Return false to stop the chain.
    async fn before(&self, _ctx: &BotContext, _message: &Message) -> crate::error::Result<bool> {
        Ok(true)
    }
    /// Processes the message. Return Stop or Reply to end the handle phase. Default: Continue.
    async fn handle(
        &self,
        _ctx: &BotContext,
        _message: &Message,
    ) -> crate::error::Result<HandlerResponse> {
        Ok(HandlerResponse::Continue)
    }
    /// Runs after the handle phase (reverse order), with the final response.
    async fn after(
        &self,
        _ctx: &BotContext,
        _message: &Message,
        _response: &HandlerResponse,
    ) -> crate::error::Result<()> {
        Ok(())
    }
}
