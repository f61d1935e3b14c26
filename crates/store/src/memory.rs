//! In-memory build store.
//!
//! The default for tests and for embedding the engine without a disk
//! footprint. Same contract as the file store, minus durability.

use std::collections::HashMap;

use async_trait::async_trait;
use sawbench_core::model::Build;
use sawbench_core::types::Id;
use tokio::sync::RwLock;

use crate::{BuildStore, StoreError};

/// `RwLock<HashMap>`-backed store.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Id, Build>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl BuildStore for MemoryStore {
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
        Ok(Some(build))
    }

    async fn delete(&self, id: Id) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn replace_all(&self, builds: Vec<Build>) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.clear();
        records.extend(builds.into_iter().map(|b| (b.id, b)));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sawbench_core::model::{
        BuildOptions, BuildStatus, Customer, Dimensions, ProjectSpec,
    };

    fn sample_build() -> Build {
        Build {
            id: uuid::Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            status: BuildStatus::Draft,
            access_code: None,
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

    #[tokio::test]
    async fn read_after_write() {
        let store = MemoryStore::new();
        let build = store.upsert(sample_build()).await.unwrap();
        let fetched = store.get(build.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, build.id);
        assert_eq!(fetched.rev, build.rev);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get(uuid::Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_whole_record() {
        let store = MemoryStore::new();
        let mut build = store.upsert(sample_build()).await.unwrap();
        build.status = BuildStatus::Approved;
        let stored = store.upsert(build.clone()).await.unwrap();
        assert_eq!(stored.status, BuildStatus::Approved);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn rev_bumps_on_every_write() {
        let store = MemoryStore::new();
        let b1 = store.upsert(sample_build()).await.unwrap();
        let b2 = store.upsert(b1.clone()).await.unwrap();
        assert!(b2.rev > b1.rev);
    }

    #[tokio::test]
    async fn checked_upsert_rejects_stale_rev() {
        let store = MemoryStore::new();
        let stored = store.upsert(sample_build()).await.unwrap();

        // A second actor writes first.
        let winner = store.upsert(stored.clone()).await.unwrap();
        assert!(winner.rev > stored.rev);

        // The stale copy now loses the CAS.
        let result = store.upsert_checked(stored).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn checked_upsert_accepts_fresh_rev() {
        let store = MemoryStore::new();
        let stored = store.upsert(sample_build()).await.unwrap();
        let updated = store.upsert_checked(stored).await.unwrap();
        assert!(updated.is_some());
    }

    #[tokio::test]
    async fn checked_upsert_inserts_new_record() {
        let store = MemoryStore::new();
        let result = store.upsert_checked(sample_build()).await.unwrap();
        assert!(result.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryStore::new();
        let build = store.upsert(sample_build()).await.unwrap();
        assert!(store.delete(build.id).await.unwrap());
        assert!(!store.delete(build.id).await.unwrap());
    }

    #[tokio::test]
    async fn replace_all_swaps_collection() {
        let store = MemoryStore::new();
        store.upsert(sample_build()).await.unwrap();
        store.upsert(sample_build()).await.unwrap();

        let replacement = vec![sample_build()];
        store.replace_all(replacement.clone()).await.unwrap();
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, replacement[0].id);
    }
}
