//! Remote reconciliation: best-effort, last-writer-wins mirroring of
//! the local record store to a remote document collection.
//!
//! This is explicitly not a consistency protocol. `sync` merges by
//! `updated_at` (ties favor local) and pushes locally-newer records;
//! `restore` is the separate, deliberately destructive path that
//! overwrites local state with the remote snapshot wholesale.

pub mod mirror;
pub mod service;

pub use mirror::{FileMirror, MemoryMirror, RemoteMirror, REMOTE_FETCH_LIMIT};
pub use service::{SyncError, SyncReport, SyncService};
