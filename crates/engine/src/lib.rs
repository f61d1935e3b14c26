//! Revision engine and render queue scheduler.
//!
//! All mutations to a build's specification or notes go through
//! [`RevisionEngine`]: each call appends exactly one new immutable
//! version and re-queues renders. [`RenderScheduler`] then drives the
//! current version's jobs through their state machine one at a time.
//!
//! Both actors share the record store and nothing else; interleaving is
//! resolved by the store's compare-and-swap (`upsert_checked`), never
//! by in-memory locks.

pub mod error;
pub mod revision;
pub mod scheduler;

pub use error::EngineError;
pub use revision::{NewBuild, RevisionEngine};
pub use scheduler::{RenderScheduler, TickOutcome, DEFAULT_STALE_AFTER_SECS};
