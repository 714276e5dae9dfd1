//! Stores shared by every bot in the process.

use std::path::Path;
use std::sync::Arc;

use storage::{NoteStore, QuestionStore};
use tracing::info;

#[derive(Clone)]
pub struct AppStores {
    pub notes: Arc<NoteStore>,
    pub questions: Arc<QuestionStore>,
}

impl AppStores {
    /// Opens (creating if needed) both store files.
    pub async fn open(notes_path: impl AsRef<Path>, questions_path: impl AsRef<Path>) -> storage::Result<Self> {
        let notes = NoteStore::open(notes_path.as_ref()).await?;
        let questions = QuestionStore::open(questions_path.as_ref()).await?;
        info!(
            notes = %notes_path.as_ref().display(),
            questions = %questions_path.as_ref().display(),
            "Stores opened"
        );
        Ok(Self {
            notes: Arc::new(notes),
            questions: Arc::new(questions),
        })
    }
}
