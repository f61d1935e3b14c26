use sawbench_core::CoreError;
use sawbench_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A domain-level error (validation, not-found with context).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The record store failed a read or write. Never swallowed:
    /// silent loss of a build record is unacceptable.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A compare-and-swap write kept losing to concurrent writers.
    #[error("Write conflict: {0}")]
    Conflict(String),
}
