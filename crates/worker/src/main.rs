use std::sync::Arc;
use std::time::Duration;

use sawbench_engine::RenderScheduler;
use sawbench_events::EventBus;
use sawbench_renderer::MockRenderer;
use sawbench_store::{BackupLog, BuildStore, JsonFileStore};
use sawbench_sync::{FileMirror, RemoteMirror, SyncService};
use sawbench_worker::WorkerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sawbench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();
    tracing::info!(?config, "Worker starting");

    let store: Arc<dyn BuildStore> = Arc::new(JsonFileStore::open(&config.store_path)?);
    let backup_log = Arc::new(BackupLog::open(&config.backup_log_path)?);
    let events = Arc::new(EventBus::default());

    let renderer = Arc::new(
        MockRenderer::new().with_latency(Duration::from_millis(config.render_delay_ms)),
    );
    let scheduler = RenderScheduler::new(store.clone(), renderer, events.clone())
        .with_stale_after(chrono::Duration::seconds(config.render_stale_secs));

    let mirror = config
        .remote_mirror_path
        .as_ref()
        .map(|path| Arc::new(FileMirror::new(path)) as Arc<dyn RemoteMirror>);
    if mirror.is_none() {
        tracing::info!("No remote mirror configured; running local-only");
    }
    let sync = SyncService::new(store.clone(), mirror, events).with_backup_log(backup_log);

    let sync_interval = Duration::from_secs(config.sync_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sync_interval);
        loop {
            interval.tick().await;
            match sync.sync().await {
                Ok(report) if report.enabled => {
                    tracing::info!(pulled = report.pulled, pushed = report.pushed, "Sync run finished");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Sync run failed"),
            }
        }
    });

    scheduler
        .run(Duration::from_millis(config.poll_interval_ms))
        .await;
    Ok(())
}
