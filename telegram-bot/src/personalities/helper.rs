//! Personal notes bot.
//!
//! Any plain text becomes a note (tags from `#word`). Notes are addressed by their short id in
//! commands and inline buttons.

use std::sync::Arc;

use async_trait::async_trait;
use bot_runtime::{BotPersonality, StateManager};
use dbot_core::{
    BotContext, Handler, HandlerResponse, InlineButton, InlineKeyboard, Message, Result,
    SendOptions,
};
use html_escape::encode_text;
use storage::{Note, NotePatch, NoteStore, StorageError};
use tracing::{error, info};

use super::logging::LoggingHandler;
use super::{preview, FAILURE_TEXT};

pub const LIST_LIMIT: usize = 10;
const BUTTON_PREVIEW: usize = 25;
const LINE_PREVIEW: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteFlow {
    AwaitingNote,
}

pub struct HelperPersonality {
    notes: Arc<NoteStore>,
    states: StateManager<NoteFlow>,
}

impl HelperPersonality {
    pub fn new(notes: Arc<NoteStore>) -> Self {
        Self {
            notes,
            states: StateManager::new(),
        }
    }
}

#[async_trait]
impl BotPersonality for HelperPersonality {
    fn get_handlers(&self, _ctx: &BotContext) -> Vec<Arc<dyn Handler>> {
        vec![
            Arc::new(LoggingHandler),
            Arc::new(NotesHandler {
                notes: self.notes.clone(),
                states: self.states.clone(),
            }),
        ]
    }
}

fn menu_row() -> Vec<InlineButton> {
    vec![
        InlineButton::callback("📝 New note", "new_note"),
        InlineButton::callback("📖 My notes", "list_notes"),
    ]
}

fn main_menu_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row(menu_row())
}

fn note_keyboard(note: &Note) -> InlineKeyboard {
    let sid = note.short_id();
    let star = if note.is_important { "➖ Not important" } else { "⭐ Important" };
    InlineKeyboard::new()
        .row(vec![
            InlineButton::callback(star, format!("important_{}", sid)),
            InlineButton::callback("🗑 Delete", format!("delete_{}", sid)),
        ])
        .button("📋 Back to list", "list_notes")
}

fn star(note: &Note) -> &'static str {
    if note.is_important {
        "⭐ "
    } else {
        ""
    }
}

/// Full view of one note.
fn render_note(note: &Note) -> String {
    let mut text = format!(
        "📝 {}<b>Note</b> <code>{}</code>\n\n{}\n\n🏷 Category: {}",
        star(note),
        encode_text(note.short_id()),
        encode_text(&note.text),
        encode_text(&note.category)
    );
    if !note.tags.is_empty() {
        let tags: Vec<String> = note.tags.iter().map(|t| format!("#{}", t)).collect();
        text.push_str(&format!("\n#️⃣ Tags: {}", encode_text(&tags.join(" "))));
    }
    if let Some(comment) = &note.comment {
        text.push_str(&format!("\n💬 Comment: {}", encode_text(comment)));
    }
    if let Some(reminder) = note.reminder_at {
        text.push_str(&format!(
            "\n🔔 Reminder: {}",
            reminder.with_timezone(&chrono::Local).format("%d.%m.%Y %H:%M")
        ));
    }
    text.push_str(&format!(
        "\n🕒 Created: {}",
        note.created_at
            .with_timezone(&chrono::Local)
            .format("%d.%m.%Y %H:%M")
    ));
    text
}

/// Numbered list with one view button per note.
fn render_list(title: &str, notes: &[Note]) -> (String, InlineKeyboard) {
    let mut text = format!("<b>{}</b>\n\n", encode_text(title));
    let mut keyboard = InlineKeyboard::new();
    for (i, note) in notes.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}<code>{}</code> {} [{}]\n",
            i + 1,
            star(note),
            encode_text(note.short_id()),
            encode_text(&preview(&note.text, LINE_PREVIEW)),
            encode_text(&note.category)
        ));
        keyboard = keyboard.button(
            format!("{}{}", star(note), preview(&note.text, BUTTON_PREVIEW)),
            format!("view_{}", note.short_id()),
        );
    }
    (text, keyboard.row(menu_row()))
}

/// Commands, callbacks and note capture.
struct NotesHandler {
    notes: Arc<NoteStore>,
    states: StateManager<NoteFlow>,
}

impl NotesHandler {
    /// Finds the caller's note by short id, or the message to show instead.
    async fn resolve(&self, user_id: i64, sid: &str) -> std::result::Result<Note, String> {
        match self.notes.find_by_short_id(user_id, sid).await {
            Ok(Some(note)) => Ok(note),
            Ok(None) => Err(format!("❌ Note {} not found.", sid)),
            Err(StorageError::AmbiguousId { matches, .. }) => Err(format!(
                "❌ {} notes start with {}. Use more characters of the id.",
                matches, sid
            )),
            Err(e) => {
                error!(user_id, short_id = %sid, error = %e, "Note lookup failed");
                Err(FAILURE_TEXT.to_string())
            }
        }
    }

    async fn list_view(&self, user_id: i64) -> (String, InlineKeyboard) {
        let notes = self.notes.recent(user_id, LIST_LIMIT).await;
        if notes.is_empty() {
            return (
                "📭 You have no notes yet. Send any text to create one.".to_string(),
                main_menu_keyboard(),
            );
        }
        render_list("📖 Your latest notes", &notes)
    }

    async fn save_note(&self, ctx: &BotContext, message: &Message, text: &str) -> Result<HandlerResponse> {
        let user_id = message.user.id;
        let requested = self.states.take(user_id).await == Some(NoteFlow::AwaitingNote);
        let note = match self.notes.create(user_id, text).await {
            Ok(note) => note,
            Err(StorageError::InvalidRecord(_)) => {
                return Ok(HandlerResponse::Reply("❌ A note cannot be empty.".to_string()));
            }
            Err(e) => {
                error!(bot = %ctx.bot_name, user_id, error = %e, "Failed to save note");
                return Ok(HandlerResponse::Reply(FAILURE_TEXT.to_string()));
            }
        };
        info!(bot = %ctx.bot_name, user_id, note_id = %note.id, requested, "Note saved");
        let headline = if requested { "✅ Note saved!" } else { "✅ Saved as a note." };
        let reply = format!("{}\n\n{}", headline, render_note(&note));
        let options = SendOptions::html().with_keyboard(note_keyboard(&note));
        ctx.bot().reply_with(message, &reply, &options).await?;
        Ok(HandlerResponse::Stop)
    }

    /// `/category <sid> <name>` and `/comment <sid> <text>`.
    async fn set_field(&self, ctx: &BotContext, message: &Message, field: &str) -> Result<HandlerResponse> {
        let usage = format!("Usage: /{} <note_id> <{}>", field, if field == "category" { "name" } else { "text" });
        let Some((sid, value)) = message
            .command_tail()
            .and_then(|tail| tail.split_once(char::is_whitespace))
            .map(|(sid, value)| (sid, value.trim()))
            .filter(|(_, value)| !value.is_empty())
        else {
            return Ok(HandlerResponse::Reply(usage));
        };

        let user_id = message.user.id;
        let note = match self.resolve(user_id, sid).await {
            Ok(note) => note,
            Err(reply) => return Ok(HandlerResponse::Reply(reply)),
        };
        let patch = if field == "category" {
            NotePatch {
                category: Some(value.to_string()),
                ..NotePatch::default()
            }
        } else {
            NotePatch {
                comment: Some(Some(value.to_string())),
                ..NotePatch::default()
            }
        };
        match self.notes.update(user_id, &note.id, patch).await {
            Ok(Some(note)) => {
                let options = SendOptions::html().with_keyboard(note_keyboard(&note));
                ctx.bot()
                    .reply_with(message, &render_note(&note), &options)
                    .await?;
                Ok(HandlerResponse::Stop)
            }
            Ok(None) => Ok(HandlerResponse::Reply(format!("❌ Note {} not found.", sid))),
            Err(e) => {
                error!(bot = %ctx.bot_name, user_id, note_id = %note.id, error = %e, "Failed to update note");
                Ok(HandlerResponse::Reply(FAILURE_TEXT.to_string()))
            }
        }
    }

    async fn on_command(&self, ctx: &BotContext, message: &Message, name: &str) -> Result<HandlerResponse> {
        let user_id = message.user.id;
        let (text, keyboard) = match name {
            "start" => {
                self.states.remove(user_id).await;
                (
                    format!(
                        "👋 Hi, {}!\n\nI keep your notes.\n\n\
                         • Send any text to save it as a note\n\
                         • Add tags with #tag\n\
                         • /list shows your latest notes\n\
                         • /help lists every command",
                        encode_text(&message.user.display_name())
                    ),
                    Some(main_menu_keyboard()),
                )
            }
            "help" => (
                "📚 <b>Commands</b>\n\n\
                 /new - new note\n\
                 /list - latest notes\n\
                 /today - notes created today\n\
                 /categories - your categories\n\
                 /stats - statistics\n\
                 /category &lt;id&gt; &lt;name&gt; - set a note's category\n\
                 /comment &lt;id&gt; &lt;text&gt; - comment a note\n\n\
                 Any other text is saved as a note."
                    .to_string(),
                None,
            ),
            "new" => {
                self.states.set(user_id, NoteFlow::AwaitingNote).await;
                (
                    "📝 <b>New note</b>\n\nSend the text of your note. Add tags with #tag.".to_string(),
                    None,
                )
            }
            "list" => {
                let (text, keyboard) = self.list_view(user_id).await;
                (text, Some(keyboard))
            }
            "today" => {
                let today = chrono::Local::now().date_naive();
                let notes = self.notes.created_on(user_id, today).await;
                if notes.is_empty() {
                    ("📅 No notes today.".to_string(), None)
                } else {
                    let (text, keyboard) = render_list("📅 Today's notes", &notes);
                    (text, Some(keyboard))
                }
            }
            "categories" => {
                let categories = self.notes.categories(user_id).await;
                if categories.is_empty() {
                    ("🏷 You have no categories yet.".to_string(), None)
                } else {
                    let mut text = "🏷 <b>Your categories</b>\n\n".to_string();
                    for category in &categories {
                        let count = self.notes.by_category(user_id, category).await.len();
                        text.push_str(&format!("• {} ({})\n", encode_text(category), count));
                    }
                    (text, None)
                }
            }
            "stats" => {
                let stats = self.notes.stats(user_id).await;
                (
                    format!(
                        "📊 <b>Statistics</b>\n\n\
                         Notes: {}\n\
                         Important: {}\n\
                         With reminders: {}\n\
                         Categories: {}",
                        stats.total, stats.important, stats.with_reminders, stats.categories
                    ),
                    None,
                )
            }
            "category" | "comment" => return self.set_field(ctx, message, name).await,
            _ => return Ok(HandlerResponse::Ignore),
        };
        let options = match keyboard {
            Some(keyboard) => SendOptions::html().with_keyboard(keyboard),
            None => SendOptions::html(),
        };
        ctx.bot().reply_with(message, &text, &options).await?;
        Ok(HandlerResponse::Stop)
    }

    async fn on_callback(&self, ctx: &BotContext, message: &Message, data: &str) -> Result<HandlerResponse> {
        let user_id = message.user.id;
        let (text, keyboard) = match data {
            "list_notes" => self.list_view(user_id).await,
            "new_note" => {
                self.states.set(user_id, NoteFlow::AwaitingNote).await;
                (
                    "📝 <b>New note</b>\n\nSend the text of your note. Add tags with #tag.".to_string(),
                    InlineKeyboard::new().button("📋 Back to list", "list_notes"),
                )
            }
            other => {
                let Some((action, sid)) = other.split_once('_') else {
                    return Ok(HandlerResponse::Ignore);
                };
                let sid = sid.trim_end_matches("_toggle");
                match action {
                    "view" | "important" | "delete" => {}
                    _ => return Ok(HandlerResponse::Ignore),
                }
                match self.resolve(user_id, sid).await {
                    Err(reply) => (reply, main_menu_keyboard()),
                    Ok(note) => self.note_action(ctx, user_id, action, note).await,
                }
            }
        };
        let options = SendOptions::html().with_keyboard(keyboard);
        ctx.bot()
            .edit(message.chat.id, &message.id, &text, &options)
            .await?;
        Ok(HandlerResponse::Stop)
    }

    async fn note_action(&self, ctx: &BotContext, user_id: i64, action: &str, note: Note) -> (String, InlineKeyboard) {
        match action {
            "important" => {
                match self
                    .notes
                    .modify(user_id, &note.id, |n| n.is_important = !n.is_important)
                    .await
                {
                    Ok(Some(note)) => (render_note(&note), note_keyboard(&note)),
                    Ok(None) => ("❌ Note not found.".to_string(), main_menu_keyboard()),
                    Err(e) => {
                        error!(bot = %ctx.bot_name, user_id, note_id = %note.id, error = %e, "Failed to toggle note");
                        (FAILURE_TEXT.to_string(), main_menu_keyboard())
                    }
                }
            }
            "delete" => match self.notes.delete(user_id, &note.id).await {
                Ok(false) => ("❌ Note not found.".to_string(), main_menu_keyboard()),
                Ok(true) => {
                    info!(bot = %ctx.bot_name, user_id, note_id = %note.id, "Note deleted");
                    (
                        "🗑 Note deleted.".to_string(),
                        InlineKeyboard::new().button("📋 Back to list", "list_notes"),
                    )
                }
                Err(e) => {
                    error!(bot = %ctx.bot_name, user_id, note_id = %note.id, error = %e, "Failed to delete note");
                    (FAILURE_TEXT.to_string(), main_menu_keyboard())
                }
            },
            _ => (render_note(&note), note_keyboard(&note)),
        }
    }
}

#[async_trait]
impl Handler for NotesHandler {
    async fn handle(&self, ctx: &BotContext, message: &Message) -> Result<HandlerResponse> {
        if let Some(data) = message.callback_data() {
            return self.on_callback(ctx, message, data).await;
        }
        if let Some(command) = message.command() {
            return self.on_command(ctx, message, &command.name).await;
        }
        match message.text() {
            Some(text) => self.save_note(ctx, message, text).await,
            None => Ok(HandlerResponse::Ignore),
        }
    }
}
