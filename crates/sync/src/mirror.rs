//! The remote document mirror boundary and its two shipped
//! implementations: an in-memory mirror with failure switches for
//! tests, and a JSON-file mirror for shared-folder style multi-device
//! continuity.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sawbench_core::model::Build;
use sawbench_core::types::Id;
use tokio::sync::{broadcast, RwLock};

/// Cap on records returned by a full remote fetch.
pub const REMOTE_FETCH_LIMIT: usize = 500;

/// Buffer capacity for change subscriptions.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A remote document collection keyed by build id.
///
/// All operations are fallible and the sync service treats every
/// failure as non-fatal except during an explicit restore.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Full collection, ordered by `updated_at` descending, capped at
    /// [`REMOTE_FETCH_LIMIT`].
    async fn fetch_all(&self) -> Result<Vec<Build>, String>;

    async fn fetch(&self, id: Id) -> Result<Option<Build>, String>;

    /// Upsert with document-merge semantics on the remote side; here
    /// the whole document is the unit.
    async fn push(&self, build: &Build) -> Result<(), String>;

    async fn remove(&self, id: Id) -> Result<(), String>;

    /// Receive records as they change through this mirror handle. A
    /// real backend surfaces its server-side change feed here; the
    /// shipped implementations only see their own pushes.
    fn subscribe(&self) -> broadcast::Receiver<Build>;
}

// ---------------------------------------------------------------------------
// MemoryMirror
// ---------------------------------------------------------------------------

/// In-memory mirror for tests, with switches to simulate outages.
pub struct MemoryMirror {
    records: RwLock<HashMap<Id, Build>>,
    fail_fetch: AtomicBool,
    fail_push: AtomicBool,
    changes: broadcast::Sender<Build>,
}

impl Default for MemoryMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMirror {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            records: RwLock::new(HashMap::new()),
            fail_fetch: AtomicBool::new(false),
            fail_push: AtomicBool::new(false),
            changes,
        }
    }

    /// Make every fetch fail until cleared.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make every push fail until cleared.
    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Seed the mirror directly, bypassing the failure switches.
    pub async fn seed(&self, builds: Vec<Build>) {
        let mut records = self.records.write().await;
        records.extend(builds.into_iter().map(|b| (b.id, b)));
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn get(&self, id: Id) -> Option<Build> {
        self.records.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl RemoteMirror for MemoryMirror {
    async fn fetch_all(&self) -> Result<Vec<Build>, String> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err("remote unavailable".to_string());
        }
        let mut builds: Vec<Build> = self.records.read().await.values().cloned().collect();
        builds.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        builds.truncate(REMOTE_FETCH_LIMIT);
        Ok(builds)
    }

    async fn fetch(&self, id: Id) -> Result<Option<Build>, String> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err("remote unavailable".to_string());
        }
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn push(&self, build: &Build) -> Result<(), String> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err("remote rejected write".to_string());
        }
        self.records.write().await.insert(build.id, build.clone());
        let _ = self.changes.send(build.clone());
        Ok(())
    }

    async fn remove(&self, id: Id) -> Result<(), String> {
        self.records.write().await.remove(&id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Build> {
        self.changes.subscribe()
    }
}

// ---------------------------------------------------------------------------
// FileMirror
// ---------------------------------------------------------------------------

/// Mirror backed by a JSON file (same array layout as the local store),
/// for synced-folder setups where devices share one mirror file.
pub struct FileMirror {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
    changes: broadcast::Sender<Build>,
}

impl FileMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
            changes,
        }
    }

    fn read_collection(&self) -> Result<HashMap<Id, Build>, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(format!("mirror read failed: {e}")),
        };
        let builds: Vec<Build> =
            serde_json::from_str(&raw).map_err(|e| format!("mirror parse failed: {e}"))?;
        Ok(builds.into_iter().map(|b| (b.id, b)).collect())
    }

    fn write_collection(&self, records: &HashMap<Id, Build>) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| format!("mirror mkdir failed: {e}"))?;
            }
        }
        let builds: Vec<&Build> = records.values().collect();
        let json = serde_json::to_string_pretty(&builds)
            .map_err(|e| format!("mirror serialize failed: {e}"))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| format!("mirror write failed: {e}"))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| format!("mirror rename failed: {e}"))?;
        Ok(())
    }
}

#[async_trait]
impl RemoteMirror for FileMirror {
    async fn fetch_all(&self) -> Result<Vec<Build>, String> {
        let _guard = self.lock.lock().await;
        let mut builds: Vec<Build> = self.read_collection()?.into_values().collect();
        builds.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        builds.truncate(REMOTE_FETCH_LIMIT);
        Ok(builds)
    }

    async fn fetch(&self, id: Id) -> Result<Option<Build>, String> {
        let _guard = self.lock.lock().await;
        Ok(self.read_collection()?.remove(&id))
    }

    async fn push(&self, build: &Build) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_collection()?;
        records.insert(build.id, build.clone());
        self.write_collection(&records)?;
        let _ = self.changes.send(build.clone());
        Ok(())
    }

    async fn remove(&self, id: Id) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_collection()?;
        if records.remove(&id).is_some() {
            self.write_collection(&records)?;
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Build> {
        self.changes.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
