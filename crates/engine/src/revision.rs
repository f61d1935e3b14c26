//! The revision engine: every specification or note mutation appends
//! exactly one new version (prepended; index 0 is current) with an
//! entirely fresh render job set.
//!
//! Mutations are compare-and-swap read-modify-write loops: a concurrent
//! writer causes a re-read and re-apply instead of a silent overwrite,
//! so a racing note submission is never lost. Exhausted retries surface
//! [`EngineError::Conflict`].

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use sawbench_core::access;
use sawbench_core::model::{
    Build, BuildOptions, BuildStatus, Customer, Dimensions, NoteAuthor, NoteItem, NoteKind,
    ProjectSpec,
};
use sawbench_core::notes;
use sawbench_core::types::Id;
use sawbench_core::version;
use sawbench_core::CoreError;
use sawbench_events::{BuildEvent, EventBus};
use sawbench_store::BuildStore;

use crate::EngineError;

/// Attempts before a contended mutation gives up.
const MAX_WRITE_RETRIES: usize = 5;

/// Characters of removed note text recorded as the change description
/// when the admin gives no explicit reason.
const REMOVAL_REASON_MAX_CHARS: usize = 60;

// ---------------------------------------------------------------------------
// Input DTO
// ---------------------------------------------------------------------------

/// Input for creating a draft build.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewBuild {
    #[validate(length(min = 1, message = "customer name is required"))]
    pub customer_name: String,
    #[validate(length(min = 1, message = "customer phone is required"))]
    pub customer_phone: String,
    #[validate(email(message = "customer email is invalid"))]
    pub customer_email: String,
    pub customer_address: Option<String>,
    #[validate(length(min = 1, message = "build type is required"))]
    pub build_type: String,
    pub dims: Dimensions,
    pub options: BuildOptions,
    /// Optional initial request notes; seeds the ledger when non-blank.
    #[serde(default)]
    pub notes: String,
}

impl NewBuild {
    /// Trim free-text fields so that whitespace-only input fails the
    /// min-length validations.
    fn normalized(mut self) -> Self {
        self.customer_name = self.customer_name.trim().to_string();
        self.customer_phone = self.customer_phone.trim().to_string();
        self.customer_email = self.customer_email.trim().to_string();
        self.build_type = self.build_type.trim().to_string();
        self.notes = self.notes.trim().to_string();
        self
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Coordinates all build mutations against the record store.
pub struct RevisionEngine {
    store: Arc<dyn BuildStore>,
    events: Arc<EventBus>,
}

impl RevisionEngine {
    pub fn new(store: Arc<dyn BuildStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    /// Create a new draft build with one initial version.
    ///
    /// The initial version renders the three standard views; the detail
    /// view only joins on refinement versions. Validation failures
    /// surface before anything persists.
    pub async fn create_draft(&self, input: NewBuild) -> Result<Build, EngineError> {
        let input = input.normalized();
        input
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let mut project = ProjectSpec {
            build_type: input.build_type,
            dims: input.dims,
            options: input.options,
            notes: input.notes,
            notes_log: Vec::new(),
        };
        project.notes_log = notes::ensure_ledger(&project);
        project.notes = notes::compile(&project.notes_log, &project.notes);

        let initial = version::new_version(&project, None, false);
        let now = Utc::now();
        let build = Build {
            id: uuid::Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            status: BuildStatus::Draft,
            access_code: None,
            customer: Customer {
                name: input.customer_name,
                phone: input.customer_phone,
                email: input.customer_email,
                address: input.customer_address,
            },
            project,
            versions: vec![initial],
            rev: 0,
        };

        let stored = self.store.upsert(build).await?;
        tracing::info!(build_id = %stored.id, "Draft build created");
        self.events.publish(BuildEvent::DraftCreated {
            build_id: stored.id,
            version_id: stored.versions[0].version_id,
        });
        Ok(stored)
    }

    /// Append a customer refinement note and create a new version with
    /// the full four-view render set.
    ///
    /// Returns `Ok(None)` when the build is unknown or both inputs are
    /// blank after trimming (explicit no-op).
    pub async fn add_customer_note(
        &self,
        id: Id,
        change_request: &str,
        note_text: &str,
    ) -> Result<Option<Build>, EngineError> {
        let change_request = change_request.trim().to_string();
        let note_text = note_text.trim().to_string();
        if change_request.is_empty() && note_text.is_empty() {
            return Ok(None);
        }

        let updated = self
            .mutate(id, |build| {
                build.project.notes_log = notes::ensure_ledger(&build.project);
                if !note_text.is_empty() {
                    build.project.notes_log.push(NoteItem::new(
                        NoteAuthor::Customer,
                        NoteKind::Refinement,
                        note_text.clone(),
                    ));
                }
                build.project.notes = notes::compile(&build.project.notes_log, "");
                let change = (!change_request.is_empty()).then(|| change_request.clone());
                let next = version::new_version(&build.project, change, true);
                build.versions.insert(0, next);
                true
            })
            .await?;

        if let Some(build) = &updated {
            self.events.publish(BuildEvent::VersionCreated {
                build_id: build.id,
                version_id: build.versions[0].version_id,
            });
        }
        Ok(updated)
    }

    /// Remove a ledger entry by id and create a new version.
    ///
    /// A missing `note_id` leaves the ledger unchanged but still
    /// creates a version — removal always re-triggers rendering, which
    /// doubles as the admin's force-refresh lever. The change request
    /// records `admin_reason`, or the removed text truncated to
    /// [`REMOVAL_REASON_MAX_CHARS`] when no reason is given.
    pub async fn remove_customer_note(
        &self,
        id: Id,
        note_id: Id,
        admin_reason: Option<&str>,
    ) -> Result<Option<Build>, EngineError> {
        let admin_reason = admin_reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let mut removed_note: Option<Id> = None;
        let updated = self
            .mutate(id, |build| {
                build.project.notes_log = notes::ensure_ledger(&build.project);
                let removed = build
                    .project
                    .notes_log
                    .iter()
                    .position(|n| n.note_id == note_id)
                    .map(|i| build.project.notes_log.remove(i));
                removed_note = removed.as_ref().map(|n| n.note_id);
                build.project.notes = notes::compile(&build.project.notes_log, "");

                let change = admin_reason.clone().or_else(|| {
                    removed
                        .as_ref()
                        .map(|n| n.text.chars().take(REMOVAL_REASON_MAX_CHARS).collect::<String>())
                });
                let next = version::new_version(&build.project, change, true);
                build.versions.insert(0, next);
                true
            })
            .await?;

        if let Some(build) = &updated {
            if let Some(note_id) = removed_note {
                self.events.publish(BuildEvent::NoteRemoved {
                    build_id: build.id,
                    note_id,
                });
            }
            self.events.publish(BuildEvent::VersionCreated {
                build_id: build.id,
                version_id: build.versions[0].version_id,
            });
        }
        Ok(updated)
    }

    /// Submit a draft: `Draft -> Submitted` only; other statuses are
    /// left untouched. Assigns an access code only when none is present
    /// and valid — an existing valid code is never regenerated.
    pub async fn mark_submitted(&self, id: Id) -> Result<Option<Build>, EngineError> {
        let updated = self
            .mutate(id, |build| {
                if build.status == BuildStatus::Draft {
                    build.status = BuildStatus::Submitted;
                }
                let has_valid_code = build
                    .access_code
                    .as_deref()
                    .is_some_and(access::code_is_valid);
                if !has_valid_code {
                    build.access_code = Some(access::generate_code());
                }
                true
            })
            .await?;

        if let Some(build) = &updated {
            self.events
                .publish(BuildEvent::BuildSubmitted { build_id: build.id });
        }
        Ok(updated)
    }

    /// Admin-set workflow label. Any status may be set from any other.
    pub async fn set_status(
        &self,
        id: Id,
        status: BuildStatus,
    ) -> Result<Option<Build>, EngineError> {
        let updated = self
            .mutate(id, |build| {
                build.status = status;
                true
            })
            .await?;

        if let Some(build) = &updated {
            self.events.publish(BuildEvent::StatusChanged {
                build_id: build.id,
                status: build.status.label().to_string(),
            });
        }
        Ok(updated)
    }

    /// Customer lookup: exact normalized phone plus exact access code.
    pub async fn find_by_phone_and_code(
        &self,
        phone: &str,
        code: &str,
    ) -> Result<Option<Build>, EngineError> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }
        Ok(self.store.get_all().await?.into_iter().find(|b| {
            b.access_code.as_deref() == Some(code) && access::phone_matches(&b.customer.phone, phone)
        }))
    }

    /// Loose "forgot my code" lookup: case-insensitive substring name
    /// match plus last-7-digit phone suffix match.
    pub async fn find_by_name_and_phone(
        &self,
        name: &str,
        phone: &str,
    ) -> Result<Option<Build>, EngineError> {
        Ok(self.store.get_all().await?.into_iter().find(|b| {
            access::name_matches(&b.customer.name, name)
                && access::phone_suffix_matches(&b.customer.phone, phone)
        }))
    }

    /// Compare-and-swap read-modify-write loop shared by all mutations.
    ///
    /// `apply` runs against a freshly-read build on every attempt;
    /// returning `false` signals a no-op. Each successful write bumps
    /// `updated_at` (the conflict-resolution authority) before persisting.
    async fn mutate<F>(&self, id: Id, mut apply: F) -> Result<Option<Build>, EngineError>
    where
        F: FnMut(&mut Build) -> bool,
    {
        for attempt in 0..MAX_WRITE_RETRIES {
            let Some(mut build) = self.store.get(id).await? else {
                return Ok(None);
            };
            if !apply(&mut build) {
                return Ok(None);
            }
            build.touch();
            if let Some(stored) = self.store.upsert_checked(build).await? {
                return Ok(Some(stored));
            }
            tracing::debug!(build_id = %id, attempt, "Write conflict; retrying mutation");
        }
        Err(EngineError::Conflict(format!(
            "build {id} kept changing while writing"
        )))
    }
}
