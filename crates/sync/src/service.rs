//! The reconciliation service: `sync` (merge + push, best-effort) and
//! `restore` (destructive, remote wins wholesale).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sawbench_core::model::Build;
use sawbench_core::types::Id;
use sawbench_events::{BuildEvent, EventBus};
use sawbench_store::{BackupAction, BackupEvent, BackupLog, BuildStore, StoreError};

use crate::mirror::RemoteMirror;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No remote mirror is configured. Only `restore` surfaces this;
    /// `sync` reports disabled instead.
    #[error("Remote mirror not configured")]
    NotConfigured,

    /// The remote call failed.
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Whether a remote mirror was configured at all.
    pub enabled: bool,
    /// Records where the remote value was adopted or a remote-only
    /// record was added locally.
    pub pulled: usize,
    /// Records sent to the remote because the local copy was newer.
    pub pushed: usize,
}

impl SyncReport {
    fn disabled() -> Self {
        Self {
            enabled: false,
            pulled: 0,
            pushed: 0,
        }
    }
}

/// Merges the local store with the remote mirror on demand.
pub struct SyncService {
    store: Arc<dyn BuildStore>,
    mirror: Option<Arc<dyn RemoteMirror>>,
    backup_log: Option<Arc<BackupLog>>,
    events: Arc<EventBus>,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn BuildStore>,
        mirror: Option<Arc<dyn RemoteMirror>>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            mirror,
            backup_log: None,
            events,
        }
    }

    /// Record every sync/restore outcome in a backup log.
    pub fn with_backup_log(mut self, log: Arc<BackupLog>) -> Self {
        self.backup_log = Some(log);
        self
    }

    /// Last-writer-wins merge with the remote mirror.
    ///
    /// Never throws for remote trouble: an unconfigured mirror reports
    /// disabled, a failed fetch reports zero pulled and leaves local
    /// data untouched, and per-record push failures are logged and
    /// skipped. Only a local store failure is an error.
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let Some(mirror) = &self.mirror else {
            tracing::debug!("Sync skipped: no remote mirror configured");
            return Ok(SyncReport::disabled());
        };

        let remote = match mirror.fetch_all().await {
            Ok(remote) => remote,
            Err(e) => {
                // A transient remote failure must never destroy local data.
                tracing::warn!(error = %e, "Remote fetch failed; sync is a no-op");
                let report = SyncReport {
                    enabled: true,
                    pulled: 0,
                    pushed: 0,
                };
                self.log_outcome(BackupAction::Sync, &report, false, Some(e))
                    .await;
                return Ok(report);
            }
        };
        let remote_by_id: HashMap<Id, Build> =
            remote.into_iter().map(|b| (b.id, b)).collect();

        let local = self.store.get_all().await?;
        let local_ids: Vec<Id> = local.iter().map(|b| b.id).collect();

        // Per-record LWW: local wins ties.
        let mut pulled = 0;
        let mut merged: Vec<Build> = Vec::with_capacity(local.len() + remote_by_id.len());
        for record in local {
            match remote_by_id.get(&record.id) {
                Some(remote_copy) if remote_copy.updated_at > record.updated_at => {
                    merged.push(remote_copy.clone());
                    pulled += 1;
                }
                _ => merged.push(record),
            }
        }
        for (id, remote_copy) in &remote_by_id {
            if !local_ids.contains(id) {
                merged.push(remote_copy.clone());
                pulled += 1;
            }
        }

        self.store.replace_all(merged.clone()).await?;

        // Push everything strictly newer than (or absent from) the
        // remote snapshot. Push is genuinely best-effort.
        let mut pushed = 0;
        for record in &merged {
            let newer_than_remote = match remote_by_id.get(&record.id) {
                None => true,
                Some(remote_copy) => record.updated_at > remote_copy.updated_at,
            };
            if !newer_than_remote {
                continue;
            }
            match mirror.push(record).await {
                Ok(()) => pushed += 1,
                Err(e) => {
                    tracing::warn!(build_id = %record.id, error = %e, "Push failed; continuing batch");
                }
            }
        }

        let report = SyncReport {
            enabled: true,
            pulled,
            pushed,
        };
        tracing::info!(pulled, pushed, "Sync complete");
        self.log_outcome(BackupAction::Sync, &report, true, None).await;
        self.events
            .publish(BuildEvent::SyncCompleted { pulled, pushed });
        Ok(report)
    }

    /// Unconditionally replace the local collection with the remote
    /// snapshot. No merge; local-only records are discarded.
    ///
    /// Unlike `sync`, failures propagate — the caller explicitly asked
    /// for the overwrite and needs to know if it did not happen.
    pub async fn restore_from_cloud(&self) -> Result<usize, SyncError> {
        let Some(mirror) = &self.mirror else {
            return Err(SyncError::NotConfigured);
        };
        let snapshot = mirror.fetch_all().await.map_err(SyncError::Remote)?;
        let count = snapshot.len();
        self.store.replace_all(snapshot).await?;

        tracing::info!(count, "Local collection restored from remote snapshot");
        let report = SyncReport {
            enabled: true,
            pulled: count,
            pushed: 0,
        };
        self.log_outcome(BackupAction::Restore, &report, true, None)
            .await;
        Ok(count)
    }

    async fn log_outcome(
        &self,
        action: BackupAction,
        report: &SyncReport,
        ok: bool,
        detail: Option<String>,
    ) {
        let Some(log) = &self.backup_log else {
            return;
        };
        let event = BackupEvent {
            at: Utc::now(),
            action,
            pulled: report.pulled,
            pushed: report.pushed,
            ok,
            detail,
        };
        if let Err(e) = log.append(event).await {
            // The log is advisory; losing an entry must not fail a sync.
            tracing::warn!(error = %e, "Failed to append backup log entry");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::MemoryMirror;
    use chrono::{Duration, Utc};
    use sawbench_core::model::{
        BuildOptions, BuildStatus, Customer, Dimensions, ProjectSpec,
    };
    use sawbench_core::types::Timestamp;
    use sawbench_store::MemoryStore;

    fn build_updated_at(updated_at: Timestamp) -> Build {
        Build {
            id: uuid::Uuid::new_v4(),
            created_at: updated_at,
            updated_at,
            status: BuildStatus::Submitted,
            access_code: Some("123456".into()),
            customer: Customer {
                name: "Jane".into(),
                phone: "5551234567".into(),
                email: "j@x.com".into(),
                address: None,
            },
            project: ProjectSpec {
                build_type: "Table".into(),
                dims: Dimensions {
                    length_in: 60.0,
                    width_in: 30.0,
                    height_in: 30.0,
                },
                options: BuildOptions {
                    wood_species: "Pine".into(),
                    finish: "Natural".into(),
                    joinery: "Screws".into(),
                },
                notes: String::new(),
                notes_log: vec![],
            },
            versions: vec![],
            rev: 0,
        }
    }

    fn service(
        store: Arc<MemoryStore>,
        mirror: Option<Arc<MemoryMirror>>,
    ) -> SyncService {
        let mirror = mirror.map(|m| m as Arc<dyn RemoteMirror>);
        SyncService::new(store, mirror, Arc::new(EventBus::default()))
    }

    #[tokio::test]
    async fn unconfigured_sync_reports_disabled() {
        let store = Arc::new(MemoryStore::new());
        let report = service(store, None).sync().await.unwrap();
        assert!(!report.enabled);
        assert_eq!(report.pulled, 0);
        assert_eq!(report.pushed, 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_a_reported_no_op() {
        let store = Arc::new(MemoryStore::new());
        let local = store.upsert(build_updated_at(Utc::now())).await.unwrap();

        let mirror = Arc::new(MemoryMirror::new());
        mirror.set_fail_fetch(true);
        let report = service(store.clone(), Some(mirror)).sync().await.unwrap();

        assert!(report.enabled);
        assert_eq!(report.pulled, 0);
        assert_eq!(report.pushed, 0);
        // Local data is untouched.
        assert!(store.get(local.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn newer_local_wins_and_is_pushed() {
        let store = Arc::new(MemoryStore::new());
        let mirror = Arc::new(MemoryMirror::new());

        let newer = build_updated_at(Utc::now());
        let mut older = newer.clone();
        older.updated_at = newer.updated_at - Duration::days(1);
        older.status = BuildStatus::Draft;

        store.upsert(newer.clone()).await.unwrap();
        mirror.seed(vec![older]).await;

        let report = service(store.clone(), Some(mirror.clone()))
            .sync()
            .await
            .unwrap();

        assert_eq!(report.pulled, 0);
        assert_eq!(report.pushed, 1);
        // Remote now carries the newer local copy.
        assert_eq!(
            mirror.get(newer.id).await.unwrap().status,
            BuildStatus::Submitted
        );
    }

    #[tokio::test]
    async fn newer_remote_wins_and_is_adopted() {
        let store = Arc::new(MemoryStore::new());
        let mirror = Arc::new(MemoryMirror::new());

        let newer = build_updated_at(Utc::now());
        let mut older = newer.clone();
        older.updated_at = newer.updated_at - Duration::days(1);
        older.status = BuildStatus::Draft;

        store.upsert(older).await.unwrap();
        mirror.seed(vec![newer.clone()]).await;

        let report = service(store.clone(), Some(mirror))
            .sync()
            .await
            .unwrap();

        assert_eq!(report.pulled, 1);
        assert_eq!(report.pushed, 0);
        let local = store.get(newer.id).await.unwrap().unwrap();
        assert_eq!(local.status, BuildStatus::Submitted);
    }

    #[tokio::test]
    async fn equal_timestamps_favor_local() {
        let store = Arc::new(MemoryStore::new());
        let mirror = Arc::new(MemoryMirror::new());

        let at = Utc::now();
        let local = build_updated_at(at);
        let mut remote = local.clone();
        remote.status = BuildStatus::Complete;

        store.upsert(local.clone()).await.unwrap();
        mirror.seed(vec![remote]).await;

        let report = service(store.clone(), Some(mirror))
            .sync()
            .await
            .unwrap();

        assert_eq!(report.pulled, 0);
        // Equal timestamps: nothing pushed either.
        assert_eq!(report.pushed, 0);
        let kept = store.get(local.id).await.unwrap().unwrap();
        assert_eq!(kept.status, BuildStatus::Submitted);
    }

    #[tokio::test]
    async fn local_only_kept_and_pushed_remote_only_adopted() {
        let store = Arc::new(MemoryStore::new());
        let mirror = Arc::new(MemoryMirror::new());

        let local_only = store.upsert(build_updated_at(Utc::now())).await.unwrap();
        let remote_only = build_updated_at(Utc::now());
        mirror.seed(vec![remote_only.clone()]).await;

        let report = service(store.clone(), Some(mirror.clone()))
            .sync()
            .await
            .unwrap();

        assert_eq!(report.pulled, 1);
        assert_eq!(report.pushed, 1);
        assert!(store.get(local_only.id).await.unwrap().is_some());
        assert!(store.get(remote_only.id).await.unwrap().is_some());
        assert!(mirror.get(local_only.id).await.is_some());
    }

    #[tokio::test]
    async fn push_failures_do_not_abort_the_batch() {
        let store = Arc::new(MemoryStore::new());
        let mirror = Arc::new(MemoryMirror::new());
        store.upsert(build_updated_at(Utc::now())).await.unwrap();
        store.upsert(build_updated_at(Utc::now())).await.unwrap();
        mirror.set_fail_push(true);

        let report = service(store.clone(), Some(mirror))
            .sync()
            .await
            .unwrap();

        // Both pushes failed, none counted, but sync itself succeeded.
        assert_eq!(report.pushed, 0);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn restore_is_destructive_and_total() {
        let store = Arc::new(MemoryStore::new());
        let mirror = Arc::new(MemoryMirror::new());

        let local_only = store.upsert(build_updated_at(Utc::now())).await.unwrap();
        let remote_a = build_updated_at(Utc::now());
        let remote_b = build_updated_at(Utc::now());
        mirror.seed(vec![remote_a.clone(), remote_b.clone()]).await;

        let count = service(store.clone(), Some(mirror))
            .restore_from_cloud()
            .await
            .unwrap();

        assert_eq!(count, 2);
        // Local collection equals exactly the remote snapshot.
        assert!(store.get(local_only.id).await.unwrap().is_none());
        assert!(store.get(remote_a.id).await.unwrap().is_some());
        assert!(store.get(remote_b.id).await.unwrap().is_some());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn restore_propagates_fetch_failure() {
        let store = Arc::new(MemoryStore::new());
        let local = store.upsert(build_updated_at(Utc::now())).await.unwrap();

        let mirror = Arc::new(MemoryMirror::new());
        mirror.set_fail_fetch(true);

        let err = service(store.clone(), Some(mirror))
            .restore_from_cloud()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Remote(_)));
        // Local data survives the failed restore.
        assert!(store.get(local.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn restore_without_mirror_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let err = service(store, None).restore_from_cloud().await.unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured));
    }

    #[tokio::test]
    async fn outcomes_are_recorded_in_the_backup_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(BackupLog::open(dir.path().join("backup_log.json")).unwrap());

        let store = Arc::new(MemoryStore::new());
        let mirror = Arc::new(MemoryMirror::new());
        mirror.seed(vec![build_updated_at(Utc::now())]).await;

        let service = SyncService::new(
            store,
            Some(mirror as Arc<dyn RemoteMirror>),
            Arc::new(EventBus::default()),
        )
        .with_backup_log(log.clone());

        service.sync().await.unwrap();
        service.restore_from_cloud().await.unwrap();

        let events = log.recent().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, BackupAction::Sync);
        assert!(events[0].ok);
        assert_eq!(events[1].action, BackupAction::Restore);
        assert_eq!(events[1].pulled, 1);
    }
}
