//! Note ledger compaction and the legacy-notes upgrade path.
//!
//! The ledger (`ProjectSpec::notes_log`) is the source of truth; the
//! compiled `notes` string is a cache that can be re-derived at any
//! time with [`compile`]. Records created before the ledger existed
//! carry only the legacy string and are upgraded via [`ensure_ledger`].

use crate::model::{NoteAuthor, NoteItem, NoteKind, ProjectSpec};

/// Fixed separator between compiled note entries.
pub const NOTE_SEPARATOR: &str = "\n\n";

/// Compile a note ledger into a single display string.
///
/// Joins entry texts (trimmed, empty ones skipped) oldest-first with
/// [`NOTE_SEPARATOR`]. An empty ledger returns the trimmed legacy
/// fallback unchanged. Pure and idempotent.
pub fn compile(notes_log: &[NoteItem], legacy_fallback: &str) -> String {
    if notes_log.is_empty() {
        return legacy_fallback.trim().to_string();
    }
    notes_log
        .iter()
        .map(|n| n.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(NOTE_SEPARATOR)
}

/// One-time upgrade path for pre-ledger records.
///
/// Returns the existing ledger unchanged when non-empty. Otherwise a
/// non-empty legacy `notes` string is wrapped into a single
/// customer/initial entry; a blank one yields an empty ledger. Never
/// duplicates: once the synthesized entry is persisted, subsequent
/// calls return it unchanged.
pub fn ensure_ledger(project: &ProjectSpec) -> Vec<NoteItem> {
    if !project.notes_log.is_empty() {
        return project.notes_log.clone();
    }
    let legacy = project.notes.trim();
    if legacy.is_empty() {
        return Vec::new();
    }
    vec![NoteItem::new(NoteAuthor::Customer, NoteKind::Initial, legacy)]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
