//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`BuildEvent`]s: the
//! revision engine, render scheduler, and sync service publish; a
//! progress UI (or a test) subscribes. Designed to be shared via
//! `Arc<EventBus>`.

use sawbench_core::model::RenderView;
use sawbench_core::types::Id;
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BuildEvent
// ---------------------------------------------------------------------------

/// A state change the rest of the application cares about.
#[derive(Debug, Clone, Serialize)]
pub enum BuildEvent {
    /// A new build draft was created with its initial version.
    DraftCreated { build_id: Id, version_id: Id },

    /// A revision operation prepended a new version.
    VersionCreated { build_id: Id, version_id: Id },

    /// A draft was submitted and holds a valid access code.
    BuildSubmitted { build_id: Id },

    /// An admin changed the workflow status label.
    StatusChanged { build_id: Id, status: String },

    /// A ledger entry was removed (forced re-render path).
    NoteRemoved { build_id: Id, note_id: Id },

    /// A render job moved from queued to rendering.
    RenderStarted {
        build_id: Id,
        version_id: Id,
        render_id: Id,
        view: RenderView,
    },

    /// A render job completed with an image attached.
    RenderCompleted {
        build_id: Id,
        version_id: Id,
        render_id: Id,
        view: RenderView,
    },

    /// A render job failed; siblings are unaffected.
    RenderFailed {
        build_id: Id,
        version_id: Id,
        render_id: Id,
        view: RenderView,
        error: String,
    },

    /// A stuck in-flight job was reclaimed to failed by the scheduler.
    RenderReclaimed {
        build_id: Id,
        version_id: Id,
        render_id: Id,
    },

    /// A reconciliation run finished.
    SyncCompleted { pulled: usize, pushed: usize },
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so any number of subscribers can
/// independently receive every published [`BuildEvent`].
pub struct EventBus {
    sender: broadcast::Sender<BuildEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are
    /// dropped and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With zero subscribers the event is silently dropped.
    pub fn publish(&self, event: BuildEvent) {
        // Ignore the SendError — it only means there are no receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<BuildEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
