//! The one error type callers special-case.

use serde::Serialize;

use super::entity::{EntityId, EntityType};
use super::summary::{ConflictPayload, ReferenceSummary};

/// A mutation was rejected because other entities still reference the subject.
///
/// This is the only error the surrounding system maps to a conflict response
/// (HTTP 409 / rejected command). Everything else coming out of the kernel is
/// a generic infrastructure failure.
///
/// Retrying without removing the dependent entities will fail identically, so
/// callers must report it, not retry it.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("{message}")]
pub struct IntegrityViolation {
    /// Rendered rejection message.
    pub message: String,
    /// The per-edge counts that triggered the rejection.
    pub summary: ReferenceSummary,
}

impl IntegrityViolation {
    /// Build a violation from a summary with references.
    pub fn new(summary: ReferenceSummary) -> Self {
        Self { message: summary.render_message(), summary }
    }

    /// The entity type whose mutation was rejected.
    pub fn subject_type(&self) -> EntityType {
        self.summary.subject_type
    }

    /// The id whose mutation was rejected.
    pub fn subject_id(&self) -> &EntityId {
        &self.summary.subject_id
    }

    /// Structured payload for the caller's conflict response.
    pub fn conflict_payload(&self) -> ConflictPayload {
        ConflictPayload::from_summary(&self.summary)
    }
}
