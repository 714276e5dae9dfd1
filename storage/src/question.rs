//! Questions users send to the admins, and the question store.
//!
//! Lifecycle: `new` -> `answered` (once, by an admin) and `new | answered` -> `archived` (terminal).

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, StorageError};
use crate::record::Record;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    New,
    Answered,
    Archived,
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Answered => "answered",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// `q<timestamp digits>_<user_id>`.
    pub id: String,
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    pub question_text: String,
    pub status: QuestionStatus,
    #[serde(default)]
    pub admin_comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub question_text: Option<String>,
    pub admin_comment: Option<String>,
}

impl Record for Question {
    type Patch = QuestionPatch;

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

    fn apply(&mut self, patch: QuestionPatch) -> Result<()> {
        if let Some(text) = patch.question_text {
            let text = text.trim();
            if text.is_empty() {
                return Err(StorageError::InvalidRecord("question text is empty".to_string()));
            }
            self.question_text = text.to_string();
        }
        if let Some(comment) = patch.admin_comment {
            self.admin_comment = comment;
        }
        Ok(())
    }
}

/// Digits between `q` and `_` in a question id.
fn id_stamp(id: &str) -> Option<u64> {
    id.strip_prefix('q')?.split('_').next()?.parse().ok()
}

/// Current local time as `YYYYMMDDHHMMSSmmm`.
fn now_stamp() -> u64 {
    Local::now()
        .format("%Y%m%d%H%M%S%3f")
        .to_string()
        .parse()
        .unwrap_or_default()
}

/// Questions of all users, persisted to one JSON file keyed by user id.
pub struct QuestionStore {
    store: RecordStore<Question>,
    last_stamp: AtomicU64,
}

impl QuestionStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store: RecordStore<Question> = RecordStore::open(path).await?;
        let last = store
            .select(|_| true)
            .await
            .iter()
            .filter_map(|q| id_stamp(&q.id))
            .max()
            .unwrap_or(0);
        Ok(Self {
            store,
            last_stamp: AtomicU64::new(last),
        })
    }

    pub fn records(&self) -> &RecordStore<Question> {
        &self.store
    }

    /// Next id stamp: the clock in milliseconds, or one past the previous stamp if that is not later.
    fn next_stamp(&self) -> u64 {
        let now = now_stamp();
        let prev = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }

    /// Saves a new question with status `new` and returns its id.
    pub async fn save_question(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        question_text: &str,
    ) -> Result<String> {
        let text = question_text.trim();
        if text.is_empty() {
            return Err(StorageError::InvalidRecord("question text is empty".to_string()));
        }
        let now = Utc::now();
        let question = Question {
            id: format!("q{}_{}", self.next_stamp(), user_id),
            user_id,
            username: username.unwrap_or_default().to_string(),
            first_name: first_name.unwrap_or_default().to_string(),
            question_text: text.to_string(),
            status: QuestionStatus::New,
            admin_comment: String::new(),
            answered_at: None,
            created_at: now,
            updated_at: now,
        };
        let question = self.store.add(question).await?;
        info!(user_id, question_id = %question.id, "Question saved");
        Ok(question.id)
    }

    /// Questions still `new`, oldest first.
    pub async fn get_pending(&self) -> Vec<Question> {
        let mut pending = self
            .store
            .select(|q| q.status == QuestionStatus::New)
            .await;
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Question> {
        self.store.find_by_id(id).await
    }

    pub async fn get_by_user(&self, user_id: i64) -> Vec<Question> {
        self.store.get_all(user_id).await
    }

    pub async fn update(
        &self,
        user_id: i64,
        id: &str,
        patch: QuestionPatch,
    ) -> Result<Option<Question>> {
        self.store.update(user_id, id, patch).await
    }

    /// `new` -> `answered`, stamping `answered_at` and the admin comment. Allowed once.
    pub async fn mark_as_answered(&self, id: &str, admin_comment: &str) -> Result<Question> {
        let comment = admin_comment.to_string();
        let question = self
            .transition(id, move |q| {
                if q.status != QuestionStatus::New {
                    return Err(StorageError::InvalidState(format!(
                        "question {} is {}, only new questions can be answered",
                        q.id, q.status
                    )));
                }
                q.status = QuestionStatus::Answered;
                q.admin_comment = comment;
                q.answered_at = Some(Utc::now());
                Ok(())
            })
            .await?;
        info!(question_id = %id, user_id = question.user_id, "Question answered");
        Ok(question)
    }

    /// Moves a `new` or `answered` question to `archived`.
    pub async fn archive(&self, id: &str) -> Result<Question> {
        let question = self
            .transition(id, |q| {
                if q.status == QuestionStatus::Archived {
                    return Err(StorageError::InvalidState(format!(
                        "question {} is already archived",
                        q.id
                    )));
                }
                q.status = QuestionStatus::Archived;
                Ok(())
            })
            .await?;
        info!(question_id = %id, "Question archived");
        Ok(question)
    }

    async fn transition<F>(&self, id: &str, f: F) -> Result<Question>
    where
        F: FnOnce(&mut Question) -> Result<()> + Send,
    {
        let owner_id = self
            .get_by_id(id)
            .await
            .map(|q| q.user_id)
            .ok_or_else(|| StorageError::NotFound(format!("question {}", id)))?;
        self.store
            .try_modify(owner_id, id, f)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("question {}", id)))
    }
}
