//! Backup event log: a capped, append-only record of sync and restore
//! runs, persisted as a JSON array in its own well-known file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sawbench_core::types::Timestamp;
use tokio::sync::Mutex;

use crate::StoreError;

/// Maximum retained events; the oldest are discarded first.
pub const MAX_BACKUP_EVENTS: usize = 50;

/// What kind of run produced a backup event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupAction {
    Sync,
    Restore,
}

/// One sync or restore outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEvent {
    pub at: Timestamp,
    pub action: BackupAction,
    pub pulled: usize,
    pub pushed: usize,
    pub ok: bool,
    /// Short human-readable outcome, e.g. an error summary.
    pub detail: Option<String>,
}

/// File-backed, capped event log.
pub struct BackupLog {
    path: PathBuf,
    events: Mutex<Vec<BackupEvent>>,
}

impl BackupLog {
    /// Open (or create) the log at `path`. Corrupt content starts empty,
    /// same defensive default as the build store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let events = Self::load(&path);
        Ok(Self {
            path,
            events: Mutex::new(events),
        })
    }

    fn load(path: &Path) -> Vec<BackupEvent> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt backup log; starting empty");
                Vec::new()
            }
        }
    }

    /// Append an event, evicting the oldest past [`MAX_BACKUP_EVENTS`].
    pub async fn append(&self, event: BackupEvent) -> Result<(), StoreError> {
        let mut events = self.events.lock().await;
        events.push(event);
        let overflow = events.len().saturating_sub(MAX_BACKUP_EVENTS);
        if overflow > 0 {
            events.drain(..overflow);
        }
        let json = serde_json::to_string_pretty(&*events)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// All retained events, oldest first.
    pub async fn recent(&self) -> Vec<BackupEvent> {
        self.events.lock().await.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
