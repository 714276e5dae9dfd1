//! Feedback bot for the "Glass Pen" channel.
//!
//! Users get the channel link, browse the FAQ, and can leave a question for the channel author.
//! Questions are stored in the shared [`QuestionStore`] and forwarded to the admin chat (or to
//! every admin when no chat is configured). Admins list pending questions with `/questions` and
//! close them with `/answer <id> <comment>`.

use std::sync::Arc;

use async_trait::async_trait;
use bot_runtime::{BotPersonality, StateManager};
use dbot_core::{
    BotContext, DbotError, Handler, HandlerResponse, InlineButton, InlineKeyboard, Message, Result,
    SendOptions,
};
use html_escape::encode_text;
use storage::{Question, QuestionStore, StorageError};
use tracing::{error, info, warn};

use super::logging::LoggingHandler;
use super::{preview, FAILURE_TEXT};

pub const DEFAULT_CHANNEL_LINK: &str = "https://t.me/glass_pen/";
pub const PENDING_LIMIT: usize = 10;
const QUESTION_PREVIEW: usize = 100;

struct FaqEntry {
    question: &'static str,
    answer: &'static str,
}

static FAQ: [FaqEntry; 5] = [
    FaqEntry {
        question: "Can I publish my poems on your channel?",
        answer: "Yes. Send your poems to the channel administrator for moderation and they will be published soon.",
    },
    FaqEntry {
        question: "What are the requirements for submitted poems?",
        answer: "• Decent language\n• About 1500 characters or 300-400 words\n• Authorship must be stated\n• A link to the published work, if there is one",
    },
    FaqEntry {
        question: "How often are new posts published?",
        answer: "There is no fixed schedule. It depends entirely on the inspiration of the author and the subscribers.",
    },
    FaqEntry {
        question: "Ask the channel author a question",
        answer: "Use the \"Ask the channel author\" button in the main menu. The author will try to answer soon.",
    },
    FaqEntry {
        question: "Vacant question",
        answer: "No answer yet.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversation {
    AwaitingQuestion,
}

pub struct GlasspenPersonality {
    questions: Arc<QuestionStore>,
    states: StateManager<Conversation>,
}

impl GlasspenPersonality {
    pub fn new(questions: Arc<QuestionStore>) -> Self {
        Self {
            questions,
            states: StateManager::new(),
        }
    }
}

#[async_trait]
impl BotPersonality for GlasspenPersonality {
    /// Reads `admin_chat_id` from the bot's extras.
    async fn setup(&self, ctx: &mut BotContext) -> Result<()> {
        if let Some(raw) = ctx.extra("admin_chat_id") {
            let chat_id = raw.trim().parse::<i64>().map_err(|_| {
                DbotError::Config(format!("admin_chat_id must be an integer, got {:?}", raw))
            })?;
            ctx.admin_chat_id = Some(chat_id);
        }
        if ctx.forward_targets().is_empty() {
            warn!(bot = %ctx.bot_name, "No admin chat or admin ids; questions will only be stored");
        }
        info!(
            bot = %ctx.bot_name,
            admin_ids = ?ctx.admin_ids,
            admin_chat_id = ?ctx.admin_chat_id,
            "Glasspen bot configured"
        );
        Ok(())
    }

    fn get_handlers(&self, ctx: &BotContext) -> Vec<Arc<dyn Handler>> {
        let channel_link = ctx
            .extra("channel_link")
            .unwrap_or(DEFAULT_CHANNEL_LINK)
            .to_string();
        vec![
            Arc::new(LoggingHandler),
            Arc::new(AdminCommands {
                questions: self.questions.clone(),
            }),
            Arc::new(GlasspenHandler {
                questions: self.questions.clone(),
                states: self.states.clone(),
                channel_link,
            }),
        ]
    }
}

pub fn main_menu_keyboard() -> InlineKeyboard {
    InlineKeyboard::new()
        .button("Copy the channel link", "show_channel")
        .button("Frequently asked questions", "show_faq")
        .button("Ask the channel author", "ask_question")
}

fn faq_keyboard() -> InlineKeyboard {
    FAQ.iter()
        .enumerate()
        .fold(InlineKeyboard::new(), |kb, (i, entry)| {
            kb.button(entry.question, format!("faq:{}", i + 1))
        })
        .button("Main menu", "main_menu")
}

fn back_to_faq_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row(vec![
        InlineButton::callback("Back", "show_faq"),
        InlineButton::callback("Main menu", "main_menu"),
    ])
}

fn cancel_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().button("Cancel", "cancel")
}

fn menu_options() -> SendOptions {
    SendOptions::html().with_keyboard(main_menu_keyboard())
}

/// Author line for admin messages: `Name (@username, id 7)`.
fn author(question: &Question) -> String {
    let name = if question.first_name.is_empty() {
        "Unknown"
    } else {
        question.first_name.as_str()
    };
    let username = if question.username.is_empty() {
        "no username".to_string()
    } else {
        format!("@{}", question.username)
    };
    format!("{} ({}, id {})", encode_text(name), encode_text(&username), question.user_id)
}

/// User-facing commands, menu callbacks and the question conversation.
struct GlasspenHandler {
    questions: Arc<QuestionStore>,
    states: StateManager<Conversation>,
    channel_link: String,
}

impl GlasspenHandler {
    fn channel_text(&self) -> String {
        format!(
            "📢 <b>The \"Glass Pen\" channel:</b>\n\n{}\n\nTap the link or copy it. Subscribe to keep up with new posts!",
            encode_text(&self.channel_link)
        )
    }

    async fn on_command(&self, ctx: &BotContext, message: &Message, name: &str) -> Result<HandlerResponse> {
        let text = match name {
            "start" => {
                self.states.remove(message.user.id).await;
                format!(
                    "👋 Welcome to the \"Glass Pen\" channel bot, {}!\n\n\
                     <b>What I can do:</b>\n\
                     • Show the channel link\n\
                     • Answer frequently asked questions\n\
                     • Pass your question to the channel author\n\n\
                     Choose an action below:",
                    encode_text(&message.user.display_name())
                )
            }
            "help" => "🆘 <b>How to use this bot</b>\n\n\
                       <b>Commands:</b>\n\
                       /start - main menu\n\
                       /help - this help\n\
                       /channel - channel link\n\n\
                       Use the menu buttons to navigate."
                .to_string(),
            "channel" => self.channel_text(),
            _ => return Ok(HandlerResponse::Ignore),
        };
        ctx.bot().reply_with(message, &text, &menu_options()).await?;
        Ok(HandlerResponse::Stop)
    }

    async fn on_callback(&self, ctx: &BotContext, message: &Message, data: &str) -> Result<HandlerResponse> {
        let (text, keyboard) = match data {
            "main_menu" => (
                "🏠 <b>Main menu</b>\n\nChoose an action:".to_string(),
                main_menu_keyboard(),
            ),
            "show_channel" => (self.channel_text(), main_menu_keyboard()),
            "show_faq" => (
                "❓ <b>Frequently asked questions</b>\n\nPick a question to see the answer:".to_string(),
                faq_keyboard(),
            ),
            "ask_question" => {
                self.states
                    .set(message.user.id, Conversation::AwaitingQuestion)
                    .await;
                (
                    "✏️ <b>Ask the channel author</b>\n\n\
                     Write your question in one message. The author will get it and answer soon.\n\n\
                     Or tap \"Cancel\"."
                        .to_string(),
                    cancel_keyboard(),
                )
            }
            "cancel" => {
                self.states.remove(message.user.id).await;
                ("❌ Question cancelled.".to_string(), main_menu_keyboard())
            }
            other => match other.strip_prefix("faq:") {
                Some(n) => match n.parse::<usize>().ok().and_then(|n| FAQ.get(n.wrapping_sub(1))) {
                    Some(entry) => (
                        format!(
                            "<b>Question:</b> {}\n\n<b>Answer:</b> {}",
                            encode_text(entry.question),
                            encode_text(entry.answer)
                        ),
                        back_to_faq_keyboard(),
                    ),
                    None => ("Question not found.".to_string(), faq_keyboard()),
                },
                None => return Ok(HandlerResponse::Ignore),
            },
        };
        let options = SendOptions::html().with_keyboard(keyboard);
        ctx.bot()
            .edit(message.chat.id, &message.id, &text, &options)
            .await?;
        Ok(HandlerResponse::Stop)
    }

    async fn on_text(&self, ctx: &BotContext, message: &Message, text: &str) -> Result<HandlerResponse> {
        if self.states.take(message.user.id).await != Some(Conversation::AwaitingQuestion) {
            ctx.bot()
                .reply_with(message, "Use the menu buttons to navigate 🗺️", &menu_options())
                .await?;
            return Ok(HandlerResponse::Stop);
        }

        let user = &message.user;
        let saved = self
            .questions
            .save_question(user.id, user.username.as_deref(), user.first_name.as_deref(), text)
            .await;
        let question_id = match saved {
            Ok(id) => id,
            Err(StorageError::InvalidRecord(_)) => {
                self.states
                    .set(user.id, Conversation::AwaitingQuestion)
                    .await;
                return Ok(HandlerResponse::Reply(
                    "The question is empty. Please write it in one message.".to_string(),
                ));
            }
            Err(e) => {
                error!(bot = %ctx.bot_name, user_id = user.id, error = %e, "Failed to save question");
                return Ok(HandlerResponse::Reply(FAILURE_TEXT.to_string()));
            }
        };

        if let Some(question) = self.questions.get_by_id(&question_id).await {
            let forwarded = format!(
                "❓ <b>New question</b> <code>{}</code>\nFrom: {}\n\n{}",
                encode_text(&question.id),
                author(&question),
                encode_text(&question.question_text)
            );
            let delivered = ctx.forward(&forwarded, &SendOptions::html()).await;
            info!(bot = %ctx.bot_name, question_id = %question.id, delivered, "Question forwarded");
        }

        let reply = format!(
            "✅ <b>Your question has been received!</b>\n\n\
             Question: {}\n\n\
             The channel author will get it and answer soon. Thank you!\n\n\
             Back to the main menu: /start",
            encode_text(&preview(text, QUESTION_PREVIEW))
        );
        ctx.bot()
            .reply_with(message, &reply, &SendOptions::html())
            .await?;
        Ok(HandlerResponse::Stop)
    }
}

#[async_trait]
impl Handler for GlasspenHandler {
    async fn handle(&self, ctx: &BotContext, message: &Message) -> Result<HandlerResponse> {
        if let Some(data) = message.callback_data() {
            return self.on_callback(ctx, message, data).await;
        }
        if let Some(command) = message.command() {
            return self.on_command(ctx, message, &command.name).await;
        }
        match message.text() {
            Some(text) => self.on_text(ctx, message, text).await,
            None => Ok(HandlerResponse::Ignore),
        }
    }
}

/// `/questions` and `/answer`, admins only.
struct AdminCommands {
    questions: Arc<QuestionStore>,
}

impl AdminCommands {
    async fn list_pending(&self) -> String {
        let pending = self.questions.get_pending().await;
        if pending.is_empty() {
            return "📭 No new questions.".to_string();
        }
        let mut text = format!("📨 <b>Unanswered questions: {}</b>\n\n", pending.len());
        for (i, q) in pending.iter().take(PENDING_LIMIT).enumerate() {
            text.push_str(&format!(
                "{}. <code>{}</code>\n   👤 {}\n   🕒 {}\n   📝 {}\n\n",
                i + 1,
                encode_text(&q.id),
                author(q),
                q.created_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M"),
                encode_text(&preview(&q.question_text, QUESTION_PREVIEW))
            ));
        }
        text.push_str("Use <code>/answer &lt;id&gt; &lt;comment&gt;</code> to answer.");
        text
    }

    async fn answer(&self, ctx: &BotContext, tail: &str) -> Result<HandlerResponse> {
        let Some((id, comment)) = tail
            .split_once(char::is_whitespace)
            .map(|(id, comment)| (id, comment.trim()))
            .filter(|(_, comment)| !comment.is_empty())
        else {
            return Ok(HandlerResponse::Reply(
                "Usage: /answer <question_id> <comment>".to_string(),
            ));
        };

        let question = match self.questions.mark_as_answered(id, comment).await {
            Ok(question) => question,
            Err(StorageError::NotFound(_)) => {
                return Ok(HandlerResponse::Reply(format!("❌ Question {} not found.", id)));
            }
            Err(StorageError::InvalidState(_)) => {
                return Ok(HandlerResponse::Reply(format!(
                    "❌ Question {} has already been answered or archived.",
                    id
                )));
            }
            Err(e) => {
                error!(bot = %ctx.bot_name, question_id = %id, error = %e, "Failed to answer question");
                return Ok(HandlerResponse::Reply(FAILURE_TEXT.to_string()));
            }
        };

        let notice = format!(
            "📬 The channel author answered your question:\n\n<i>{}</i>\n\n{}",
            encode_text(&preview(&question.question_text, QUESTION_PREVIEW)),
            encode_text(comment)
        );
        if let Err(e) = ctx
            .bot()
            .send(question.user_id, &notice, &SendOptions::html())
            .await
        {
            warn!(bot = %ctx.bot_name, user_id = question.user_id, error = %e, "Could not deliver answer to user");
        }

        Ok(HandlerResponse::Reply(format!(
            "✅ Question {} marked as answered.\nComment: {}",
            id,
            preview(comment, QUESTION_PREVIEW)
        )))
    }
}

#[async_trait]
impl Handler for AdminCommands {
    async fn handle(&self, ctx: &BotContext, message: &Message) -> Result<HandlerResponse> {
        let Some(command) = message.command() else {
            return Ok(HandlerResponse::Ignore);
        };
        if !matches!(command.name.as_str(), "questions" | "answer") {
            return Ok(HandlerResponse::Ignore);
        }
        if !ctx.is_admin(message.user.id) {
            warn!(bot = %ctx.bot_name, user_id = message.user.id, command = %command.name, "Admin command refused");
            return Ok(HandlerResponse::Reply(
                "⛔ You do not have access to this command.".to_string(),
            ));
        }
        match command.name.as_str() {
            "questions" => {
                let text = self.list_pending().await;
                ctx.bot()
                    .reply_with(message, &text, &SendOptions::html())
                    .await?;
                Ok(HandlerResponse::Stop)
            }
            _ => self.answer(ctx, message.command_tail().unwrap_or_default()).await,
        }
    }
}
