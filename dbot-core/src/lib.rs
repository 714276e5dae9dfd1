//! # dbot-core
//!
//! Core types and traits shared by every bot: [`Bot`] (outbound messages), [`Handler`], [`BotContext`],
//! inbound [`Message`] / [`User`] / [`Chat`], errors, and tracing initialization.
//! Transport-agnostic; dbot-telegram maps teloxide onto these types and bot-runtime drives them.

pub mod bot;
pub mod context;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::{parse_message_id, Bot, InlineButton, InlineKeyboard, SendOptions, TextFormat};
pub use context::BotContext;
pub use error::{DbotError, HandlerError, Result};
pub use logger::init_tracing;
pub use types::{
    Chat, CommandInvocation, Handler, HandlerResponse, Message, ToCoreMessage, ToCoreUser,
    UpdateKind, User,
};
