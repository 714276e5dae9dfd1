//! Storage crate: JSON-file record persistence for notes and questions.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`record`] – Record trait (id, owner, timestamps, patches)
//! - [`store`] – RecordStore (generic JSON-backed store)
//! - [`note`] – Note, NotePatch, NoteStore
//! - [`question`] – Question, QuestionStatus, QuestionStore

mod error;
mod note;
mod question;
mod record;
mod store;

pub use error::{Result, StorageError};
pub use note::{extract_tags, Note, NotePatch, NoteStats, NoteStore, DEFAULT_CATEGORY, MAX_TAGS, SHORT_ID_LEN};
pub use question::{Question, QuestionPatch, QuestionStatus, QuestionStore};
pub use record::Record;
pub use store::RecordStore;
