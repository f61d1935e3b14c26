use std::path::PathBuf;

/// Worker configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Path of the local build collection (default: `./data/builds.json`).
    pub store_path: PathBuf,
    /// Path of the backup event log (default: `./data/backup_log.json`).
    pub backup_log_path: PathBuf,
    /// Scheduler poll interval in milliseconds (default: `1000`).
    pub poll_interval_ms: u64,
    /// Seconds between sync runs (default: `300`).
    pub sync_interval_secs: u64,
    /// Seconds before an in-flight render is reclaimed (default: `300`).
    pub render_stale_secs: i64,
    /// Artificial latency of the mock renderer in milliseconds
    /// (default: `150`).
    pub render_delay_ms: u64,
    /// Path of the shared remote mirror file. Unset means sync is
    /// disabled.
    pub remote_mirror_path: Option<PathBuf>,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                   |
    /// |----------------------|---------------------------|
    /// | `STORE_PATH`         | `./data/builds.json`      |
    /// | `BACKUP_LOG_PATH`    | `./data/backup_log.json`  |
    /// | `POLL_INTERVAL_MS`   | `1000`                    |
    /// | `SYNC_INTERVAL_SECS` | `300`                     |
    /// | `RENDER_STALE_SECS`  | `300`                     |
    /// | `RENDER_DELAY_MS`    | `150`                     |
    /// | `REMOTE_MIRROR_PATH` | unset (sync disabled)     |
    pub fn from_env() -> Self {
        let store_path = std::env::var("STORE_PATH")
            .unwrap_or_else(|_| "./data/builds.json".into())
            .into();

        let backup_log_path = std::env::var("BACKUP_LOG_PATH")
            .unwrap_or_else(|_| "./data/backup_log.json".into())
            .into();

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let sync_interval_secs: u64 = std::env::var("SYNC_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("SYNC_INTERVAL_SECS must be a valid u64");

        let render_stale_secs: i64 = std::env::var("RENDER_STALE_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("RENDER_STALE_SECS must be a valid i64");

        let render_delay_ms: u64 = std::env::var("RENDER_DELAY_MS")
            .unwrap_or_else(|_| "150".into())
            .parse()
            .expect("RENDER_DELAY_MS must be a valid u64");

        let remote_mirror_path = std::env::var("REMOTE_MIRROR_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            store_path,
            backup_log_path,
            poll_interval_ms,
            sync_interval_secs,
            render_stale_secs,
            render_delay_ms,
            remote_mirror_path,
        }
    }
}
