//! Integration tests for [`storage::NoteStore`] and the underlying [`storage::RecordStore`].
//!
//! Each test opens a store in its own temporary directory.

use std::time::Duration;

use chrono::Local;
use storage::{Note, NotePatch, NoteStore, RecordStore, StorageError, DEFAULT_CATEGORY};
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> NoteStore {
    NoteStore::open(dir.path().join("notes.json"))
        .await
        .expect("Failed to open note store")
}

/// **Test: Note lifecycle: add, list, update, delete.**
///
/// **Setup:** Empty store.
/// **Action:** User 42 saves "Buy milk #errand", sets category "Shopping", deletes it twice.
/// **Expected:** Defaults on add; update changes category and bumps updated_at; delete true then false.
#[tokio::test]
async fn test_note_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let note = store.create(42, "Buy milk #errand").await.unwrap();
    assert_eq!(note.category, DEFAULT_CATEGORY);
    assert_eq!(note.tags, vec!["errand"]);
    assert!(!note.is_important);

    let all = store.get_all(42).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].created_at, all[0].updated_at);

    let updated = store
        .update(
            42,
            &note.id,
            NotePatch {
                category: Some("Shopping".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .expect("note exists");
    assert_eq!(updated.category, "Shopping");
    assert_eq!(updated.text, "Buy milk #errand");
    assert!(updated.updated_at > note.updated_at);

    assert!(store.delete(42, &note.id).await.unwrap());
    assert!(!store.delete(42, &note.id).await.unwrap());
    assert!(store.get_all(42).await.is_empty());
}

/// **Test: Update on a missing note returns None and does not touch the file.**
///
/// **Setup:** Store with one note for user 1.
/// **Action:** Update an unknown id; update the right id under the wrong owner.
/// **Expected:** Both return None.
#[tokio::test]
async fn test_update_missing_returns_none() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let note = store.create(1, "hello").await.unwrap();

    let patch = NotePatch {
        is_important: Some(true),
        ..Default::default()
    };
    assert!(store.update(1, "missing", patch.clone()).await.unwrap().is_none());
    assert!(store.update(2, &note.id, patch).await.unwrap().is_none());
    assert!(store.get(2, &note.id).await.is_none());
}

/// **Test: Text updates are validated and re-derive tags.**
///
/// **Setup:** Note "Buy milk #errand" for user 42.
/// **Action:** Patch the text to blank; then to "Call mom #family #weekend".
/// **Expected:** Blank text fails with InvalidRecord and leaves the note as it was; the second
/// patch stores the trimmed text with tags taken from it.
#[tokio::test]
async fn test_update_text_validates_and_retags() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let note = store.create(42, "Buy milk #errand").await.unwrap();

    let blank = NotePatch {
        text: Some("   ".to_string()),
        ..Default::default()
    };
    let err = store.update(42, &note.id, blank).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidRecord(_)));
    assert_eq!(store.get(42, &note.id).await.unwrap(), note);

    let retext = NotePatch {
        text: Some("  Call mom #family #weekend ".to_string()),
        ..Default::default()
    };
    let updated = store.update(42, &note.id, retext).await.unwrap().unwrap();
    assert_eq!(updated.text, "Call mom #family #weekend");
    assert_eq!(updated.tags, vec!["family", "weekend"]);

    let reopened = open_store(&dir).await;
    assert_eq!(reopened.get(42, &note.id).await.unwrap().tags, updated.tags);
}

/// **Test: A failed write surfaces an Io error and leaves memory unchanged.**
///
/// **Setup:** Store with one note; the data file is then replaced by a directory.
/// **Action:** Add a second note.
/// **Expected:** Err(Io); get_all still returns only the first note.
#[tokio::test]
async fn test_write_failure_rolls_back() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let first = store.create(42, "first").await.unwrap();

    let path = dir.path().join("notes.json");
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let err = store.create(42, "second").await.unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));
    assert_eq!(store.get_all(42).await, vec![first]);
}

/// **Test: Successive updates strictly increase updated_at.**
///
/// **Setup:** One note.
/// **Action:** Three back-to-back updates.
/// **Expected:** Each updated_at is strictly greater than the previous one.
#[tokio::test]
async fn test_updates_strictly_bump_updated_at() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let note = store.create(9, "draft").await.unwrap();

    let mut last = note.updated_at;
    for i in 0..3 {
        let updated = store
            .update(
                9,
                &note.id,
                NotePatch {
                    text: Some(format!("draft {}", i)),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.updated_at > last);
        assert!(updated.updated_at >= updated.created_at);
        last = updated.updated_at;
    }
}

/// **Test: Records survive a reopen of the same file.**
///
/// **Setup:** Two users with notes, one note modified.
/// **Action:** Drop the store and open the file again.
/// **Expected:** Same records, same order, same field values.
#[tokio::test]
async fn test_round_trip_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("notes.json");

    let before = {
        let store = NoteStore::open(&path).await.unwrap();
        let first = store.create(1, "first #a #b").await.unwrap();
        store.create(1, "second").await.unwrap();
        store.create(2, "other user").await.unwrap();
        store
            .update(
                1,
                &first.id,
                NotePatch {
                    comment: Some(Some("checked".to_string())),
                    reminder_at: Some(Some(chrono::Utc::now())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (store.get_all(1).await, store.get_all(2).await)
    };

    let reopened = NoteStore::open(&path).await.unwrap();
    assert_eq!(reopened.get_all(1).await, before.0);
    assert_eq!(reopened.get_all(2).await, before.1);
    assert_eq!(reopened.with_reminders().await.len(), 1);
}

/// **Test: Missing file is created as an empty JSON object.**
///
/// **Setup:** Path in a directory that does not exist yet.
/// **Action:** Open the store.
/// **Expected:** File exists and contains `{}`; no `.tmp` file is left after a write.
#[tokio::test]
async fn test_missing_file_created() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("notes.json");

    let store: RecordStore<Note> = RecordStore::open(&path).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    assert!(store.is_empty().await);

    store.add(Note::new(3, "x").unwrap()).await.unwrap();
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["3"].as_array().map(Vec::len), Some(1));
    assert!(!dir.path().join("data").join("notes.json.tmp").exists());
}

/// **Test: Malformed file degrades to an empty store.**
///
/// **Setup:** File containing invalid JSON.
/// **Action:** Open the store, then add a note.
/// **Expected:** Open succeeds empty; the add rewrites the file as valid JSON.
#[tokio::test]
async fn test_malformed_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = NoteStore::open(&path).await.unwrap();
    assert!(store.get_all(1).await.is_empty());

    store.create(1, "fresh start").await.unwrap();
    let reopened = NoteStore::open(&path).await.unwrap();
    assert_eq!(reopened.get_all(1).await.len(), 1);
}

/// **Test: recent() sorts newest first without reordering storage.**
///
/// **Setup:** Three notes created a few milliseconds apart.
/// **Action:** `recent(1, 2)`.
/// **Expected:** Two newest, newest first; get_all keeps insertion order.
#[tokio::test]
async fn test_recent_and_queries() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let a = store.create(1, "a").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let b = store.create(1, "b").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let c = store.create(1, "c").await.unwrap();

    let recent: Vec<String> = store.recent(1, 2).await.into_iter().map(|n| n.id).collect();
    assert_eq!(recent, vec![c.id.clone(), b.id.clone()]);
    let stored: Vec<String> = store.get_all(1).await.into_iter().map(|n| n.id).collect();
    assert_eq!(stored, vec![a.id.clone(), b.id, c.id]);

    store
        .update(
            1,
            &a.id,
            NotePatch {
                category: Some("Work".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(store.by_category(1, "work").await.len(), 1);
    let categories: Vec<String> = store.categories(1).await.into_iter().collect();
    assert_eq!(categories, vec!["Work".to_string(), DEFAULT_CATEGORY.to_string()]);

    assert_eq!(store.created_on(1, Local::now().date_naive()).await.len(), 3);

    let stats = store.stats(1).await;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.categories, 2);
    assert_eq!(stats.important, 0);
}

/// **Test: modify() toggles a flag under the store lock.**
///
/// **Setup:** One note.
/// **Action:** Toggle importance twice.
/// **Expected:** true, then false; unknown id yields None.
#[tokio::test]
async fn test_modify_toggle() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let note = store.create(5, "toggle me").await.unwrap();

    let once = store
        .modify(5, &note.id, |n| n.is_important = !n.is_important)
        .await
        .unwrap()
        .unwrap();
    assert!(once.is_important);
    let twice = store
        .modify(5, &note.id, |n| n.is_important = !n.is_important)
        .await
        .unwrap()
        .unwrap();
    assert!(!twice.is_important);
    assert!(twice.updated_at > once.updated_at);

    assert!(store.modify(5, "nope", |_| {}).await.unwrap().is_none());
}

/// **Test: Short id lookup resolves unique prefixes and rejects ambiguous ones.**
///
/// **Setup:** Records with hand-picked ids sharing a prefix.
/// **Action:** Look up a unique prefix, a shared prefix and an unknown prefix.
/// **Expected:** Some, AmbiguousId, None.
#[tokio::test]
async fn test_find_by_short_id() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    for id in ["abcd1111-0000", "abcd2222-0000", "ffff0000-0000"] {
        let mut note = Note::new(8, "n").unwrap();
        note.id = id.to_string();
        store.add(note).await.unwrap();
    }

    let found = store.find_by_short_id(8, "ffff0000").await.unwrap();
    assert_eq!(found.map(|n| n.id), Some("ffff0000-0000".to_string()));

    let err = store.find_by_short_id(8, "abcd").await.unwrap_err();
    assert!(matches!(err, StorageError::AmbiguousId { matches: 2, .. }));

    assert!(store.find_by_short_id(8, "0123").await.unwrap().is_none());
    assert!(store.find_by_short_id(9, "ffff0000").await.unwrap().is_none());
}

/// **Test: Concurrent adds from many tasks are all persisted.**
///
/// **Setup:** Shared store behind an Arc.
/// **Action:** 20 tasks each add one note for the same user.
/// **Expected:** 20 notes in memory and after reopening.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.json");
    let store = std::sync::Arc::new(NoteStore::open(&path).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.create(77, &format!("note {}", i)).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(store.get_all(77).await.len(), 20);
    let reopened = NoteStore::open(&path).await.unwrap();
    assert_eq!(reopened.get_all(77).await.len(), 20);
}
