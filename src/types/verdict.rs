//! Validation verdict produced by the orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use super::summary::ReferenceSummary;
use super::violation::IntegrityViolation;

/// The outcome of one validation call.
///
/// Created by the [`IntegrityValidator`](crate::validator::IntegrityValidator)
/// and consumed immediately by the gate (or by the caller of the standalone
/// `validate_*` operations).
#[derive(Debug, Clone, Serialize)]
pub struct ValidationVerdict {
    /// Whether the mutation is safe under the current policy.
    pub is_valid: bool,
    /// Rendered rejection message, present only on invalid verdicts.
    pub error_message: Option<String>,
    /// Per-edge counts backing the verdict.
    pub summary: ReferenceSummary,
    /// Wall-clock time spent validating.
    #[serde(skip)]
    pub duration: Duration,
    /// When the validation ran.
    pub checked_at: DateTime<Utc>,
}

impl ValidationVerdict {
    /// Build a verdict from an assembled summary.
    ///
    /// Invalid iff the summary found any references.
    pub fn from_summary(summary: ReferenceSummary, duration: Duration) -> Self {
        let error_message = summary.has_references().then(|| summary.render_message());
        Self {
            is_valid: error_message.is_none(),
            error_message,
            summary,
            duration,
            checked_at: Utc::now(),
        }
    }

    /// Build the always-valid verdict returned when validation is disabled.
    ///
    /// Carries an empty summary: no edges were counted.
    pub fn disabled(summary: ReferenceSummary, duration: Duration) -> Self {
        Self {
            is_valid: true,
            error_message: None,
            summary,
            duration,
            checked_at: Utc::now(),
        }
    }

    /// Turn an invalid verdict into the error callers special-case.
    ///
    /// Returns `None` for valid verdicts.
    pub fn into_violation(self) -> Option<IntegrityViolation> {
        if self.is_valid {
            return None;
        }
        Some(IntegrityViolation::new(self.summary))
    }
}
