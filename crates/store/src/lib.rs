//! The Record Store: whole-document persistence for [`Build`] records.
//!
//! The store is the single source of truth and the only shared mutable
//! resource in the system. Every mutator reads, modifies, and writes the
//! *entire* build document; `upsert_checked` provides the
//! compare-and-swap needed when independent actors (revision engine,
//! render scheduler, sync) interleave against the same record.
//!
//! Two implementations: [`MemoryStore`] for tests and embedding, and
//! [`JsonFileStore`] persisting one JSON array of builds in a single
//! well-known file.
//!
//! [`Build`]: sawbench_core::model::Build

pub mod backup;
pub mod error;
pub mod file;
pub mod memory;

pub use backup::{BackupAction, BackupEvent, BackupLog, MAX_BACKUP_EVENTS};
pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use sawbench_core::model::Build;
use sawbench_core::types::Id;

/// Whole-document CRUD over the build collection.
///
/// Contract:
/// - `upsert` replaces the stored record entirely (no field merge) and
///   is durable before returning; an immediately-subsequent `get` on the
///   same instance reflects the write.
/// - `upsert_checked` additionally rejects writes whose `rev` does not
///   match the stored record, returning `Ok(None)` on conflict.
/// - Write failures surface as [`StoreError`]; they are never swallowed.
#[async_trait]
pub trait BuildStore: Send + Sync {
    /// Every known build, unfiltered. Order unspecified; callers sort.
    async fn get_all(&self) -> Result<Vec<Build>, StoreError>;

    async fn get(&self, id: Id) -> Result<Option<Build>, StoreError>;

    /// Insert or fully replace. Bumps `rev` on the stored copy and
    /// returns it.
    async fn upsert(&self, build: Build) -> Result<Build, StoreError>;

    /// Compare-and-swap upsert: succeeds only when `build.rev` matches
    /// the stored record's `rev` (or the record is new). Returns the
    /// stored copy on success, `None` when the write lost a race.
    async fn upsert_checked(&self, build: Build) -> Result<Option<Build>, StoreError>;

    /// Remove a record. Returns whether it existed.
    async fn delete(&self, id: Id) -> Result<bool, StoreError>;

    /// Replace the whole collection in one step. Used by sync (merged
    /// set) and restore (remote snapshot).
    async fn replace_all(&self, builds: Vec<Build>) -> Result<(), StoreError>;
}
