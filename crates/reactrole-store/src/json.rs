//! JSON file storage.
//!
//! The whole collection is kept as one JSON array and rewritten on every
//! change. Writes go to a sibling temp file first and are renamed into place,
//! so a crash mid-write leaves the previous collection intact.

use async_trait::async_trait;
use parking_lot::RwLock;
use reactrole_types::{Binding, BindingId};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::traits::{BindingStore, LoadPolicy};

/// File-backed store with full-collection overwrite semantics.
pub struct JsonFileStore {
    path: PathBuf,
    load_policy: LoadPolicy,
    records: RwLock<Vec<Binding>>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store at `path`, creating parent directories if needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_policy(path, LoadPolicy::default()).await
    }

    /// Open a store with an explicit load policy.
    pub async fn open_with_policy(path: impl Into<PathBuf>, load_policy: LoadPolicy) -> Result<Self> {
        let path = path.into();

        let records = if tokio::fs::try_exists(&path).await? {
            Self::read_file(&path).await?
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            Vec::new()
        };

        debug!(path = %path.display(), records = records.len(), "Opened JSON binding store");

        Ok(Self {
            path,
            load_policy,
            records: RwLock::new(records),
            write_lock: Mutex::new(()),
        })
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(path: &Path) -> Result<Vec<Binding>> {
        let raw = tokio::fs::read_to_string(path).await?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<Binding> = serde_json::from_str(&raw)?;
        for record in &records {
            if let Err(e) = record.validate() {
                warn!(path = %path.display(), error = %e, "Persisted binding violates invariants");
            }
        }
        Ok(records)
    }

    /// Rewrite the whole collection.
    async fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let json = {
            let records = self.records.read();
            serde_json::to_vec_pretty(&*records)?
        };

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = json.len(), "Flushed binding store");
        Ok(())
    }
}

#[async_trait]
impl BindingStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn load(&self) -> Result<Vec<Binding>> {
        let records = if tokio::fs::try_exists(&self.path).await? {
            Self::read_file(&self.path).await?
        } else {
            Vec::new()
        };

        *self.records.write() = records.clone();

        Ok(records
            .into_iter()
            .filter(|b| self.load_policy.admits(b))
            .collect())
    }

    async fn upsert(&self, binding: &Binding) -> Result<()> {
        {
            let mut records = self.records.write();
            match records.iter_mut().find(|b| b.id == binding.id) {
                Some(existing) => *existing = binding.clone(),
                None => records.push(binding.clone()),
            }
        }
        self.flush().await
    }

    async fn remove(&self, id: &BindingId) -> Result<bool> {
        let removed = {
            let mut records = self.records.write();
            let before = records.len();
            records.retain(|b| &b.id != id);
            records.len() != before
        };

        if removed {
            self.flush().await?;
        }
        Ok(removed)
    }
}
