#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Local persistence write/read failed (disk full, permissions).
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized for persistence.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
