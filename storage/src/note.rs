//! User notes and the note store.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, Utc};
use lazy_regex::regex;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::record::Record;
use crate::store::RecordStore;

pub const DEFAULT_CATEGORY: &str = "uncategorized";
pub const MAX_TAGS: usize = 5;
pub const SHORT_ID_LEN: usize = 8;

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub user_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Note {
    /// New note with a fresh UUID, default category and tags taken from `#word` patterns.
    /// Fails with [`StorageError::InvalidRecord`] when `text` is blank.
    pub fn new(user_id: i64, text: impl Into<String>) -> Result<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(StorageError::InvalidRecord("note text is empty".to_string()));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            tags: extract_tags(&text),
            text,
            created_at: now,
            updated_at: now,
            category: default_category(),
            is_important: false,
            reminder_at: None,
            comment: None,
        })
    }

    /// First 8 characters of the id, used in commands and callback data.
    pub fn short_id(&self) -> &str {
        self.id.get(..SHORT_ID_LEN).unwrap_or(&self.id)
    }
}

/// Distinct `#word` tags in order of first appearance, without the `#`, at most [`MAX_TAGS`].
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for cap in regex!(r"#(\w+)").captures_iter(text) {
        let tag = &cap[1];
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

/// Fields to change on a note. `reminder_at` and `comment` use a nested option so they can be cleared.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub text: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_important: Option<bool>,
    pub reminder_at: Option<Option<DateTime<Utc>>>,
    pub comment: Option<Option<String>>,
}

impl Record for Note {
    type Patch = NotePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> i64 {
        self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    /// New text is trimmed and must not be blank; tags are re-derived from it unless the patch
    /// sets them explicitly.
    fn apply(&mut self, patch: NotePatch) -> Result<()> {
        if let Some(text) = patch.text {
            let text = text.trim();
            if text.is_empty() {
                return Err(StorageError::InvalidRecord("note text is empty".to_string()));
            }
            self.tags = extract_tags(text);
            self.text = text.to_string();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(is_important) = patch.is_important {
            self.is_important = is_important;
        }
        if let Some(reminder_at) = patch.reminder_at {
            self.reminder_at = reminder_at;
        }
        if let Some(comment) = patch.comment {
            self.comment = comment;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteStats {
    pub total: usize,
    pub important: usize,
    pub with_reminders: usize,
    pub categories: usize,
}

/// Notes of all users, persisted to one JSON file.
pub struct NoteStore {
    store: RecordStore<Note>,
}

impl NoteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            store: RecordStore::open(path).await?,
        })
    }

    pub fn records(&self) -> &RecordStore<Note> {
        &self.store
    }

    pub async fn add(&self, note: Note) -> Result<Note> {
        let note = self.store.add(note).await?;
        info!(user_id = note.user_id, note_id = %note.id, "Note added");
        Ok(note)
    }

    /// Builds a note from `text` and stores it.
    pub async fn create(&self, user_id: i64, text: &str) -> Result<Note> {
        self.add(Note::new(user_id, text)?).await
    }

    pub async fn get(&self, user_id: i64, id: &str) -> Option<Note> {
        self.store.get(user_id, id).await
    }

    pub async fn get_all(&self, user_id: i64) -> Vec<Note> {
        self.store.get_all(user_id).await
    }

    pub async fn update(&self, user_id: i64, id: &str, patch: NotePatch) -> Result<Option<Note>> {
        let updated = self.store.update(user_id, id, patch).await?;
        if updated.is_some() {
            info!(user_id, note_id = %id, "Note updated");
        }
        Ok(updated)
    }

    pub async fn modify<F>(&self, user_id: i64, id: &str, f: F) -> Result<Option<Note>>
    where
        F: FnOnce(&mut Note) + Send,
    {
        self.store.modify(user_id, id, f).await
    }

    pub async fn delete(&self, user_id: i64, id: &str) -> Result<bool> {
        let removed = self.store.delete(user_id, id).await?;
        if removed {
            info!(user_id, note_id = %id, "Note deleted");
        }
        Ok(removed)
    }

    /// Most recent `limit` notes, newest first. Equal timestamps keep insertion order.
    pub async fn recent(&self, user_id: i64, limit: usize) -> Vec<Note> {
        let mut notes = self.get_all(user_id).await;
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes.truncate(limit);
        notes
    }

    /// Case-insensitive category filter.
    pub async fn by_category(&self, user_id: i64, category: &str) -> Vec<Note> {
        let wanted = category.to_lowercase();
        self.get_all(user_id)
            .await
            .into_iter()
            .filter(|n| n.category.to_lowercase() == wanted)
            .collect()
    }

    /// Distinct categories in lexicographic order.
    pub async fn categories(&self, user_id: i64) -> BTreeSet<String> {
        self.get_all(user_id)
            .await
            .into_iter()
            .map(|n| n.category)
            .collect()
    }

    /// Notes of every user that carry a reminder.
    pub async fn with_reminders(&self) -> Vec<Note> {
        self.store.select(|n| n.reminder_at.is_some()).await
    }

    /// Notes created on `date` in local time.
    pub async fn created_on(&self, user_id: i64, date: NaiveDate) -> Vec<Note> {
        self.get_all(user_id)
            .await
            .into_iter()
            .filter(|n| n.created_at.with_timezone(&Local).date_naive() == date)
            .collect()
    }

    pub async fn stats(&self, user_id: i64) -> NoteStats {
        let notes = self.get_all(user_id).await;
        NoteStats {
            total: notes.len(),
            important: notes.iter().filter(|n| n.is_important).count(),
            with_reminders: notes.iter().filter(|n| n.reminder_at.is_some()).count(),
            categories: notes.iter().map(|n| &n.category).collect::<BTreeSet<_>>().len(),
        }
    }

    /// Resolves a short id prefix to one note. A prefix shared by several notes is rejected
    /// with [`StorageError::AmbiguousId`].
    pub async fn find_by_short_id(&self, user_id: i64, prefix: &str) -> Result<Option<Note>> {
        if prefix.is_empty() {
            return Ok(None);
        }
        let mut matches: Vec<Note> = self
            .get_all(user_id)
            .await
            .into_iter()
            .filter(|n| n.id.starts_with(prefix))
            .collect();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(StorageError::AmbiguousId {
                prefix: prefix.to_string(),
                matches: n,
            }),
        }
    }
}
