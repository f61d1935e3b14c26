//! JSON-file build store.
//!
//! Persists the whole collection as one JSON array of build documents
//! in a single well-known file. Writes go to a temp file in the same
//! directory followed by a rename, so readers never observe a partial
//! write. Corrupt or unreadable content on load degrades to an empty
//! collection; write failures surface as [`StoreError`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sawbench_core::model::Build;
use sawbench_core::types::Id;
use tokio::sync::RwLock;

use crate::{BuildStore, StoreError};

/// Store backed by a single JSON file, with a full in-memory copy.
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<HashMap<Id, Build>>,
}

impl JsonFileStore {
    /// Open (or create) a store at `path`.
    ///
    /// A missing file starts empty. Unreadable or corrupt content also
    /// starts empty, with a warning — an unreadable collection must not
    /// take the whole application down.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let records = Self::load(&path);
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    fn load(path: &Path) -> HashMap<Id, Build> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable build store; starting empty");
                return HashMap::new();
            }
        };
        match serde_json::from_str::<Vec<Build>>(&raw) {
            Ok(builds) => builds.into_iter().map(|b| (b.id, b)).collect(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt build store; starting empty");
                HashMap::new()
            }
        }
    }

    /// Serialize the full collection and atomically swap it into place.
    fn persist(&self, records: &HashMap<Id, Build>) -> Result<(), StoreError> {
        let builds: Vec<&Build> = records.values().collect();
        let json = serde_json::to_string_pretty(&builds)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BuildStore for JsonFileStore {
    async fn get_all(&self) -> Result<Vec<Build>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn get(&self, id: Id) -> Result<Option<Build>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn upsert(&self, mut build: Build) -> Result<Build, StoreError> {
        let mut records = self.records.write().await;
        build.rev = records.get(&build.id).map(|b| b.rev).unwrap_or(build.rev) + 1;
        records.insert(build.id, build.clone());
        self.persist(&records)?;
        Ok(build)
    }

    async fn upsert_checked(&self, mut build: Build) -> Result<Option<Build>, StoreError> {
        let mut records = self.records.write().await;
        if let Some(stored) = records.get(&build.id) {
            if stored.rev != build.rev {
                return Ok(None);
            }
        }
        build.rev += 1;
        records.insert(build.id, build.clone());
        self.persist(&records)?;
        Ok(Some(build))
    }

    async fn delete(&self, id: Id) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let existed = records.remove(&id).is_some();
        if existed {
            self.persist(&records)?;
        }
        Ok(existed)
    }

    async fn replace_all(&self, builds: Vec<Build>) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.clear();
        records.extend(builds.into_iter().map(|b| (b.id, b)));
        self.persist(&records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
