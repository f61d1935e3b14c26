//! External renderer boundary.
//!
//! The render scheduler drives jobs through the [`Renderer`] trait and
//! treats the implementation as opaque: arbitrary latency, may fail, no
//! idempotence guarantee (re-rendering the same inputs need not produce
//! byte-identical output). The product ships [`MockRenderer`], a
//! deterministic stand-in for the real 3D pipeline.

pub mod mock;

pub use mock::MockRenderer;

use async_trait::async_trait;
use sawbench_core::model::{BuildOptions, Dimensions, RenderView};

/// Inputs for a single render: one camera angle over the current
/// dimensions, options, and compiled notes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub view: RenderView,
    pub dims: Dimensions,
    pub options: BuildOptions,
    pub notes: String,
}

/// Errors surfaced by a renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The renderer rejected or failed the request.
    #[error("Render failed: {0}")]
    Failed(String),

    /// The renderer is unreachable or not running.
    #[error("Renderer unavailable: {0}")]
    Unavailable(String),
}

/// An external render service.
///
/// Returns an opaque image handle (a data URL). One call per job; the
/// scheduler serializes calls per version, so implementations may be
/// stateful and expensive.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<String, RenderError>;
}
