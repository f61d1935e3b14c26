//! Mock 3D renderer.
//!
//! The production render pipeline is itself a mock: it synthesizes a
//! flat SVG line drawing of the requested piece and returns it as a
//! data URL. Output is deterministic for identical inputs, which the
//! real pipeline does not promise and callers must not rely on.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use sawbench_core::model::RenderView;

use crate::{RenderError, RenderRequest, Renderer};

/// Deterministic stand-in renderer with injectable latency and
/// per-view failure switches (used by scheduler tests).
#[derive(Default)]
pub struct MockRenderer {
    latency: Option<Duration>,
    failing_views: HashSet<RenderView>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before producing a result, imitating a busy
    /// render farm.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every render of `view` fails with [`RenderError::Failed`].
    pub fn failing_view(mut self, view: RenderView) -> Self {
        self.failing_views.insert(view);
        self
    }

    fn svg_for(request: &RenderRequest) -> String {
        let RenderRequest { view, dims, options, .. } = request;
        // A flat projection: pick the two axes the camera angle shows.
        let (w, h) = match view {
            RenderView::Front => (dims.length_in, dims.height_in),
            RenderView::Top => (dims.length_in, dims.width_in),
            RenderView::Iso | RenderView::Detail => {
                (dims.length_in + dims.width_in * 0.5, dims.height_in + dims.width_in * 0.3)
            }
        };
        format!(
            "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 {vw} {vh}'>\
             <rect x='4' y='4' width='{w:.1}' height='{h:.1}' fill='none' stroke='#6b4f2a' stroke-width='2'/>\
             <text x='8' y='{label_y:.1}' font-size='9' fill='#6b4f2a'>{species} / {finish} ({view_name})</text>\
             </svg>",
            vw = w + 8.0,
            vh = h + 20.0,
            label_y = h + 16.0,
            species = options.wood_species,
            finish = options.finish,
            view_name = view.as_str(),
        )
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, RenderError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing_views.contains(&request.view) {
            return Err(RenderError::Failed(format!(
                "mock failure for view {}",
                request.view.as_str()
            )));
        }
        tracing::debug!(view = request.view.as_str(), "Mock render produced");
        Ok(format!(
            "data:image/svg+xml;utf8,{}",
            Self::svg_for(request)
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
