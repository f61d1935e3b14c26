//! Version construction: frozen snapshots and fresh render job sets.
//!
//! Every specification or note change produces a new [`Version`] via
//! [`new_version`]; existing versions are never mutated. Draft versions
//! get the three standard views; refinement versions add the detail
//! view on top.

use chrono::Utc;

use crate::model::{InputsSnapshot, ProjectSpec, RenderJob, RenderView, Version};
use crate::notes;

/// The three views every version renders, in creation (queue) order.
pub const STANDARD_VIEWS: [RenderView; 3] = [RenderView::Iso, RenderView::Front, RenderView::Top];

/// Views for a new version, in queue order: `iso, front, top[, detail]`.
pub fn render_views(include_detail: bool) -> Vec<RenderView> {
    let mut views = STANDARD_VIEWS.to_vec();
    if include_detail {
        views.push(RenderView::Detail);
    }
    views
}

/// An entirely fresh queued job set. Jobs are never carried over from a
/// prior version.
pub fn fresh_render_jobs(include_detail: bool) -> Vec<RenderJob> {
    render_views(include_detail)
        .into_iter()
        .map(RenderJob::queued)
        .collect()
}

/// Freeze the live project into an immutable snapshot, compiling the
/// note ledger into the snapshot's display string.
pub fn snapshot(project: &ProjectSpec) -> InputsSnapshot {
    InputsSnapshot {
        build_type: project.build_type.clone(),
        dims: project.dims,
        options: project.options.clone(),
        notes: notes::compile(&project.notes_log, &project.notes),
        notes_log: project.notes_log.clone(),
    }
}

/// Build a new version from the live project state.
///
/// Estimates start unset; the render scheduler attaches them as jobs
/// complete.
pub fn new_version(
    project: &ProjectSpec,
    customer_change_request: Option<String>,
    include_detail: bool,
) -> Version {
    Version {
        version_id: uuid::Uuid::new_v4(),
        created_at: Utc::now(),
        customer_change_request,
        inputs_snapshot: snapshot(project),
        renders: fresh_render_jobs(include_detail),
        estimate_public: None,
        estimate_internal: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
