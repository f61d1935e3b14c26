//! Render queue scheduler: one job at a time per current version.
//!
//! Each tick re-reads the build fresh from the store — a revision
//! operation may have replaced `versions[0]` with a freshly-queued set
//! at any point, and the scheduler must never act on a superseded
//! snapshot. The claim (queued -> rendering) persists through a
//! compare-and-swap before the expensive render call begins, so a
//! second scheduler instance cannot start a concurrent render for the
//! same version.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use sawbench_core::model::{Build, RenderStatus, RenderView};
use sawbench_core::pricing;
use sawbench_core::types::Id;
use sawbench_events::{BuildEvent, EventBus};
use sawbench_renderer::{RenderError, RenderRequest, Renderer};
use sawbench_store::BuildStore;

use crate::EngineError;

/// Attempts before a contended result write gives up.
const MAX_WRITE_RETRIES: usize = 5;

/// A job `rendering` longer than this is treated as abandoned and
/// reclaimed to `failed` on the next tick.
pub const DEFAULT_STALE_AFTER_SECS: i64 = 300;

/// What a single scheduler tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do: no build, no version, or no queued jobs left.
    Idle,
    /// Another actor's render is in flight; observed, not advanced.
    InFlight { render_id: Id },
    /// A job rendered successfully and its result was persisted.
    Completed { render_id: Id, view: RenderView },
    /// The renderer failed; the job is terminally failed.
    Failed { render_id: Id, view: RenderView },
    /// An abandoned in-flight job was reclaimed to failed.
    Reclaimed { render_id: Id },
    /// A concurrent writer replaced the build mid-tick; nothing done.
    Superseded,
}

/// Drives render jobs for the current version of each build.
pub struct RenderScheduler {
    store: Arc<dyn BuildStore>,
    renderer: Arc<dyn Renderer>,
    events: Arc<EventBus>,
    stale_after: chrono::Duration,
}

impl RenderScheduler {
    pub fn new(
        store: Arc<dyn BuildStore>,
        renderer: Arc<dyn Renderer>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            renderer,
            events,
            stale_after: chrono::Duration::seconds(DEFAULT_STALE_AFTER_SECS),
        }
    }

    /// Override the abandoned-render reclaim timeout.
    pub fn with_stale_after(mut self, stale_after: chrono::Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Advance at most one render job for `build_id`.
    pub async fn tick(&self, build_id: Id) -> Result<TickOutcome, EngineError> {
        // Always a fresh read; never trust a cached copy.
        let Some(build) = self.store.get(build_id).await? else {
            return Ok(TickOutcome::Idle);
        };
        let Some(current) = build.current_version() else {
            return Ok(TickOutcome::Idle);
        };
        let version_id = current.version_id;

        // An in-flight job is observed, never doubled. A job without a
        // start time or one past the stale window is abandoned work.
        if let Some(job) = current
            .renders
            .iter()
            .find(|j| j.status == RenderStatus::Rendering)
        {
            let render_id = job.render_id;
            let stale = match job.started_at {
                Some(started) => Utc::now() - started > self.stale_after,
                None => true,
            };
            if !stale {
                return Ok(TickOutcome::InFlight { render_id });
            }
            return self.reclaim(build, version_id, render_id).await;
        }

        // First queued job in creation order is the candidate.
        let Some(job) = current
            .renders
            .iter()
            .find(|j| j.status == RenderStatus::Queued)
        else {
            return Ok(TickOutcome::Idle);
        };
        let render_id = job.render_id;
        let view = job.view;
        let request = RenderRequest {
            view,
            dims: current.inputs_snapshot.dims,
            options: current.inputs_snapshot.options.clone(),
            notes: current.inputs_snapshot.notes.clone(),
        };

        // Claim: persist the queued -> rendering transition before the
        // expensive call so every other reader sees it. Losing the CAS
        // means another actor got here first.
        let mut claimed = build;
        let Some(slot) = job_mut(&mut claimed, version_id, render_id) else {
            return Ok(TickOutcome::Superseded);
        };
        slot.status = RenderStatus::Rendering;
        slot.started_at = Some(Utc::now());
        claimed.touch();
        if self.store.upsert_checked(claimed).await?.is_none() {
            return Ok(TickOutcome::Superseded);
        }
        self.events.publish(BuildEvent::RenderStarted {
            build_id,
            version_id,
            render_id,
            view,
        });
        tracing::debug!(%build_id, %render_id, view = view.as_str(), "Render started");

        let result = self.renderer.render(&request).await;
        self.finish_job(build_id, version_id, render_id, view, result)
            .await
    }

    /// Tick until the current version has no more queued work.
    ///
    /// Intended for tests and batch callers; the long-running poll loop
    /// is [`run`](Self::run).
    pub async fn drain(&self, build_id: Id) -> Result<(), EngineError> {
        loop {
            match self.tick(build_id).await? {
                TickOutcome::Completed { .. }
                | TickOutcome::Failed { .. }
                | TickOutcome::Reclaimed { .. } => continue,
                TickOutcome::Idle
                | TickOutcome::InFlight { .. }
                | TickOutcome::Superseded => return Ok(()),
            }
        }
    }

    /// Poll loop over every build in the store. Never returns; spawn it.
    ///
    /// One failing build's tick is logged and does not stop the others.
    pub async fn run(&self, poll_interval: Duration) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let builds = match self.store.get_all().await {
                Ok(builds) => builds,
                Err(e) => {
                    tracing::error!(error = %e, "Scheduler failed to list builds");
                    continue;
                }
            };
            for build in builds {
                if let Err(e) = self.tick(build.id).await {
                    tracing::error!(build_id = %build.id, error = %e, "Scheduler tick failed");
                }
            }
        }
    }

    /// Persist the outcome of a finished render.
    ///
    /// The build is re-read and the job located by version id — a
    /// revision operation may have prepended a new version while the
    /// render ran, so the job's version is not necessarily index 0
    /// anymore. The result still lands on the job that ran.
    async fn finish_job(
        &self,
        build_id: Id,
        version_id: Id,
        render_id: Id,
        view: RenderView,
        result: Result<String, RenderError>,
    ) -> Result<TickOutcome, EngineError> {
        for attempt in 0..MAX_WRITE_RETRIES {
            let Some(mut build) = self.store.get(build_id).await? else {
                // Deleted mid-render; nowhere to record the result.
                return Ok(TickOutcome::Idle);
            };
            {
                let Some(version) = build.version_by_id_mut(version_id) else {
                    return Ok(TickOutcome::Superseded);
                };
                let estimate =
                    pricing::estimate(&version.inputs_snapshot.dims, &version.inputs_snapshot.options);
                {
                    let Some(job) = version
                        .renders
                        .iter_mut()
                        .find(|j| j.render_id == render_id)
                    else {
                        return Ok(TickOutcome::Superseded);
                    };
                    job.finished_at = Some(Utc::now());
                    match &result {
                        Ok(image_data_url) => {
                            job.status = RenderStatus::Complete;
                            job.image_data_url = Some(image_data_url.clone());
                            job.estimate_public = Some(estimate.public_view());
                        }
                        Err(_) => {
                            job.status = RenderStatus::Failed;
                        }
                    }
                }
                if result.is_ok() {
                    // The aggregate estimate comes from the same pricing
                    // computation as the per-job snapshot.
                    version.estimate_public = Some(estimate.public_view());
                    version.estimate_internal = Some(estimate);
                }
            }
            build.touch();
            if self.store.upsert_checked(build).await?.is_some() {
                return Ok(match result {
                    Ok(_) => {
                        self.events.publish(BuildEvent::RenderCompleted {
                            build_id,
                            version_id,
                            render_id,
                            view,
                        });
                        TickOutcome::Completed { render_id, view }
                    }
                    Err(e) => {
                        tracing::warn!(%build_id, %render_id, error = %e, "Render failed");
                        self.events.publish(BuildEvent::RenderFailed {
                            build_id,
                            version_id,
                            render_id,
                            view,
                            error: e.to_string(),
                        });
                        TickOutcome::Failed { render_id, view }
                    }
                });
            }
            tracing::debug!(%build_id, %render_id, attempt, "Result write conflict; retrying");
        }
        Err(EngineError::Conflict(format!(
            "build {build_id} kept changing while recording a render result"
        )))
    }

    /// Mark an abandoned in-flight job as failed.
    async fn reclaim(
        &self,
        mut build: Build,
        version_id: Id,
        render_id: Id,
    ) -> Result<TickOutcome, EngineError> {
        let build_id = build.id;
        {
            let Some(version) = build.version_by_id_mut(version_id) else {
                return Ok(TickOutcome::Superseded);
            };
            let Some(job) = version
                .renders
                .iter_mut()
                .find(|j| j.render_id == render_id)
            else {
                return Ok(TickOutcome::Superseded);
            };
            job.status = RenderStatus::Failed;
            job.finished_at = Some(Utc::now());
        }
        build.touch();
        if self.store.upsert_checked(build).await?.is_none() {
            return Ok(TickOutcome::Superseded);
        }
        tracing::warn!(%build_id, %render_id, "Reclaimed abandoned render as failed");
        self.events.publish(BuildEvent::RenderReclaimed {
            build_id,
            version_id,
            render_id,
        });
        Ok(TickOutcome::Reclaimed { render_id })
    }
}

fn job_mut<'a>(
    build: &'a mut Build,
    version_id: Id,
    render_id: Id,
) -> Option<&'a mut sawbench_core::model::RenderJob> {
    build
        .version_by_id_mut(version_id)?
        .renders
        .iter_mut()
        .find(|j| j.render_id == render_id)
}
