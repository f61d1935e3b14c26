//! Build aggregate and its owned records.
//!
//! A [`Build`] owns an ordered history of [`Version`]s (newest first);
//! each version owns a frozen [`InputsSnapshot`] and a fresh set of
//! [`RenderJob`]s. The live [`ProjectSpec`] on the build is the working
//! copy that revision operations read from and fork into new snapshots.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::pricing::{Estimate, PublicEstimate};
use crate::types::{Id, Timestamp};

// ---------------------------------------------------------------------------
// Status / view / note enums
// ---------------------------------------------------------------------------

/// Workflow label for a build. Admin-settable; any status may be set
/// from any other. The only transition with dedicated logic is
/// `Draft -> Submitted` (see the revision engine's `mark_submitted`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Draft,
    Submitted,
    Reviewing,
    QuoteSent,
    Approved,
    InBuild,
    Complete,
}

impl BuildStatus {
    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Reviewing => "Reviewing",
            Self::QuoteSent => "Quote sent",
            Self::Approved => "Approved",
            Self::InBuild => "In build",
            Self::Complete => "Complete",
        }
    }
}

/// Camera angle for a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderView {
    Iso,
    Front,
    Top,
    Detail,
}

impl RenderView {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iso => "iso",
            Self::Front => "front",
            Self::Top => "top",
            Self::Detail => "detail",
        }
    }
}

/// Render job lifecycle. Forward-only:
/// `Queued -> Rendering -> Complete | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Queued,
    Rendering,
    Complete,
    Failed,
}

impl RenderStatus {
    /// Complete and failed jobs never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Who wrote a note ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteAuthor {
    Customer,
    Admin,
}

/// Whether a note came in with the original request or a later refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Initial,
    Refinement,
}

// ---------------------------------------------------------------------------
// Value objects
// ---------------------------------------------------------------------------

/// Contact snapshot captured at draft creation. Immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: Option<String>,
}

/// Outer dimensions of the requested piece, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_in: f64,
    pub width_in: f64,
    pub height_in: f64,
}

/// Material and construction choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOptions {
    pub wood_species: String,
    pub finish: String,
    pub joinery: String,
}

/// One entry in a build's append/remove-only note ledger.
///
/// Entries are never edited in place; ordering is append sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteItem {
    pub note_id: Id,
    pub created_at: Timestamp,
    pub author: NoteAuthor,
    pub kind: NoteKind,
    pub text: String,
}

impl NoteItem {
    pub fn new(author: NoteAuthor, kind: NoteKind, text: impl Into<String>) -> Self {
        Self {
            note_id: uuid::Uuid::new_v4(),
            created_at: Utc::now(),
            author,
            kind,
            text: text.into(),
        }
    }
}

/// The live project specification on a build.
///
/// `notes` is a compiled cache of `notes_log` (see [`crate::notes`]);
/// the ledger is the source of truth. `notes_log` defaults to empty for
/// records persisted before the ledger existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub build_type: String,
    pub dims: Dimensions,
    pub options: BuildOptions,
    pub notes: String,
    #[serde(default)]
    pub notes_log: Vec<NoteItem>,
}

/// Frozen copy of the project inputs at the moment a version was created.
/// Never mutated afterwards; any further edit produces a new [`Version`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputsSnapshot {
    pub build_type: String,
    pub dims: Dimensions,
    pub options: BuildOptions,
    pub notes: String,
    pub notes_log: Vec<NoteItem>,
}

// ---------------------------------------------------------------------------
// Render jobs and versions
// ---------------------------------------------------------------------------

/// One unit of render work, owned by exactly one [`Version`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub render_id: Id,
    pub view: RenderView,
    pub status: RenderStatus,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    /// Opaque result handle from the renderer.
    pub image_data_url: Option<String>,
    /// Per-job pricing snapshot attached on completion.
    pub estimate_public: Option<PublicEstimate>,
}

impl RenderJob {
    /// A fresh job waiting in the queue.
    pub fn queued(view: RenderView) -> Self {
        Self {
            render_id: uuid::Uuid::new_v4(),
            view,
            status: RenderStatus::Queued,
            started_at: None,
            finished_at: None,
            image_data_url: None,
            estimate_public: None,
        }
    }
}

/// An immutable snapshot of the project plus its render work.
///
/// Created every time the specification or notes change. Scheduler
/// updates job status fields in place; the snapshot itself is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub version_id: Id,
    pub created_at: Timestamp,
    /// Human-readable description of what changed vs. the prior version.
    pub customer_change_request: Option<String>,
    pub inputs_snapshot: InputsSnapshot,
    pub renders: Vec<RenderJob>,
    pub estimate_public: Option<PublicEstimate>,
    pub estimate_internal: Option<Estimate>,
}

// ---------------------------------------------------------------------------
// Build aggregate
// ---------------------------------------------------------------------------

/// The root aggregate: one customer build request with its full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: Id,
    pub created_at: Timestamp,
    /// Refreshed on every mutation; the authority for conflict resolution.
    pub updated_at: Timestamp,
    pub status: BuildStatus,
    /// 6-digit customer lookup credential, assigned once at submission.
    pub access_code: Option<String>,
    pub customer: Customer,
    pub project: ProjectSpec,
    /// Newest first; index 0 is the current version.
    pub versions: Vec<Version>,
    /// Optimistic-concurrency token, bumped by the store on every write.
    /// Defaults to 0 for records persisted before the token existed.
    #[serde(default)]
    pub rev: u64,
}

impl Build {
    /// The current version, if any (index 0, newest first).
    pub fn current_version(&self) -> Option<&Version> {
        self.versions.first()
    }

    pub fn current_version_mut(&mut self) -> Option<&mut Version> {
        self.versions.first_mut()
    }

    /// Find a version anywhere in the history by its id.
    pub fn version_by_id(&self, version_id: Id) -> Option<&Version> {
        self.versions.iter().find(|v| v.version_id == version_id)
    }

    pub fn version_by_id_mut(&mut self, version_id: Id) -> Option<&mut Version> {
        self.versions.iter_mut().find(|v| v.version_id == version_id)
    }

    /// Refresh `updated_at`. Call on every mutation before persisting.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
