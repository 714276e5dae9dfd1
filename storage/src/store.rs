//! Generic JSON-file record store.
//!
//! The whole dataset lives in memory as `owner_id -> Vec<R>` (insertion order) and is mirrored to
//! one JSON object keyed by the stringified owner id. Every mutation rewrites the document through
//! a sibling `.tmp` file that is renamed over the target. One async mutex serializes all operations,
//! so each call is a complete read-modify-write-persist.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::record::Record;

type Owners<R> = BTreeMap<i64, Vec<R>>;

pub struct RecordStore<R: Record> {
    path: PathBuf,
    records: Mutex<Owners<R>>,
}

impl<R: Record> RecordStore<R> {
    /// Opens the store at `path`, creating the file (as `{}`) and parent directories when missing.
    /// An unreadable or malformed document loads as an empty store with a warning.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        if fs::metadata(&path).await.is_err() {
            fs::write(&path, b"{}").await?;
            info!(path = %path.display(), "Created new record file");
        }

        let records = load(&path).await;
        let total: usize = records.values().map(Vec::len).sum();
        info!(
            path = %path.display(),
            owners = records.len(),
            records = total,
            "Record store loaded"
        );

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record` to its owner's list and persists.
    pub async fn add(&self, record: R) -> Result<R> {
        let owner_id = record.owner_id();
        let stored = record.clone();
        self.mutate_owner(owner_id, move |list| {
            list.push(record);
            Some(())
        })
        .await?;
        debug!(owner_id, id = %stored.id(), "Record added");
        Ok(stored)
    }

    pub async fn get(&self, owner_id: i64, id: &str) -> Option<R> {
        let records = self.records.lock().await;
        records
            .get(&owner_id)
            .and_then(|list| list.iter().find(|r| r.id() == id))
            .cloned()
    }

    /// All records of one owner in insertion order.
    pub async fn get_all(&self, owner_id: i64) -> Vec<R> {
        let records = self.records.lock().await;
        records.get(&owner_id).cloned().unwrap_or_default()
    }

    /// Applies the present fields of `patch`, bumps `updated_at` and persists. A patch the record
    /// rejects changes nothing.
    pub async fn update(&self, owner_id: i64, id: &str, patch: R::Patch) -> Result<Option<R>> {
        self.try_modify(owner_id, id, move |record| record.apply(patch))
            .await
    }

    /// Read-modify-write of one record under the store lock.
    pub async fn modify<F>(&self, owner_id: i64, id: &str, f: F) -> Result<Option<R>>
    where
        F: FnOnce(&mut R) + Send,
    {
        self.try_modify(owner_id, id, move |record| {
            f(record);
            Ok(())
        })
        .await
    }

    /// Like [`modify`](Self::modify), but `f` may reject the change; the record is left untouched
    /// and the error is returned.
    pub async fn try_modify<F>(&self, owner_id: i64, id: &str, f: F) -> Result<Option<R>>
    where
        F: FnOnce(&mut R) -> Result<()> + Send,
    {
        let mut rejected = None;
        let updated = self
            .mutate_owner(owner_id, |list| {
                let slot = list.iter_mut().find(|r| r.id() == id)?;
                let mut candidate = slot.clone();
                if let Err(e) = f(&mut candidate) {
                    rejected = Some(e);
                    return None;
                }
                candidate.touch();
                *slot = candidate.clone();
                Some(candidate)
            })
            .await?;

        if let Some(e) = rejected {
            return Err(e);
        }
        if updated.is_none() {
            debug!(owner_id, id, "Record not found for update");
        }
        Ok(updated)
    }

    /// Removes the first record with `id`. Returns whether one was removed.
    pub async fn delete(&self, owner_id: i64, id: &str) -> Result<bool> {
        let removed = self
            .mutate_owner(owner_id, |list| {
                let idx = list.iter().position(|r| r.id() == id)?;
                Some(list.remove(idx))
            })
            .await?;
        if removed.is_none() {
            debug!(owner_id, id, "Record not found for delete");
        }
        Ok(removed.is_some())
    }

    /// Records of every owner matching `pred`, owners in ascending id order.
    pub async fn select<P>(&self, pred: P) -> Vec<R>
    where
        P: Fn(&R) -> bool,
    {
        let records = self.records.lock().await;
        records
            .values()
            .flat_map(|list| list.iter())
            .filter(|r| pred(r))
            .cloned()
            .collect()
    }

    /// First record of any owner with this id.
    pub async fn find_by_id(&self, id: &str) -> Option<R> {
        let records = self.records.lock().await;
        records
            .values()
            .flat_map(|list| list.iter())
            .find(|r| r.id() == id)
            .cloned()
    }

    /// Total number of stored records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Runs `f` on one owner's list; when it reports a change (`Some`) the document is persisted.
    /// If persisting fails the owner's list is restored and the error returned.
    async fn mutate_owner<T, F>(&self, owner_id: i64, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Vec<R>) -> Option<T>,
    {
        let mut records = self.records.lock().await;
        let snapshot = records.get(&owner_id).cloned();
        let list = records.entry(owner_id).or_default();

        let Some(out) = f(list) else {
            if snapshot.is_none() {
                records.remove(&owner_id);
            }
            return Ok(None);
        };

        if let Err(e) = persist(&self.path, &records).await {
            warn!(path = %self.path.display(), error = %e, "Failed to persist record store");
            match snapshot {
                Some(list) => records.insert(owner_id, list),
                None => records.remove(&owner_id),
            };
            return Err(e);
        }
        Ok(Some(out))
    }
}

async fn load<R: Record>(path: &Path) -> Owners<R> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Record file unreadable, starting empty");
            return Owners::new();
        }
    };
    let document: BTreeMap<String, Vec<R>> = match serde_json::from_slice(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Record file malformed, starting empty");
            return Owners::new();
        }
    };

    let mut records = Owners::new();
    for (key, list) in document {
        match key.parse::<i64>() {
            Ok(owner_id) => {
                records.insert(owner_id, list);
            }
            Err(_) => warn!(path = %path.display(), key = %key, "Skipping non-numeric owner key"),
        }
    }
    records
}

async fn persist<R: Record>(path: &Path, records: &Owners<R>) -> Result<()> {
    let document: BTreeMap<String, &Vec<R>> = records
        .iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(owner_id, list)| (owner_id.to_string(), list))
        .collect();
    let body = serde_json::to_vec_pretty(&document)?;

    let tmp = tmp_path(path);
    fs::write(&tmp, &body).await?;
    fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = body.len(), "Record store persisted");
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
