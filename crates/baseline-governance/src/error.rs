//! Governance errors
//!
//! Every variant carries a stable machine-readable code plus structured
//! details so callers can render the refusal without parsing messages.

use crate::scope::ScopeDiff;
use baseline_criteria::{BriefId, CriterionCode, DocumentId, UnitId};
use serde_json::{json, Value};
use thiserror::Error;

/// Refusals from the scope-change validator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeChangeError {
    #[error("exactly one criterion may change per request ({} changed)", .diff.changed_count())]
    OneAtATime { diff: ScopeDiff },

    #[error("criterion code '{given}' is not a valid P/M/D code")]
    InvalidCode { given: String },

    #[error("a reason of at least {min} characters is required (got {actual})")]
    ReasonTooShort { min: usize, actual: usize },

    #[error(
        "declared change {declared_code} excluded={declared_excluded} does not match \
         {inferred_code} excluded={inferred_excluded}"
    )]
    Mismatch {
        declared_code: CriterionCode,
        declared_excluded: bool,
        inferred_code: CriterionCode,
        inferred_excluded: bool,
    },

    #[error("brief is already used for grading; confirm the live change to proceed")]
    LiveChangeUnconfirmed {
        submission_count: u64,
        linked_brief_count: u64,
    },
}

impl ScopeChangeError {
    /// Stable error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OneAtATime { .. } => "BRIEF_CRITERIA_SCOPE_CHANGE_ONE_AT_A_TIME",
            Self::InvalidCode { .. } | Self::ReasonTooShort { .. } => {
                "BRIEF_CRITERIA_SCOPE_CHANGE_REASON_REQUIRED"
            }
            Self::Mismatch { .. } => "BRIEF_CRITERIA_SCOPE_CHANGE_MISMATCH",
            Self::LiveChangeUnconfirmed { .. } => "BRIEF_CRITERIA_SCOPE_CHANGE_CONFIRM_REQUIRED",
        }
    }

    /// Structured details for the failure envelope
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::OneAtATime { diff } => json!({
                "previousExcluded": diff.previous,
                "nextExcluded": diff.next,
                "added": diff.added,
                "removed": diff.removed,
            }),
            Self::InvalidCode { given } => json!({ "criterionCode": given }),
            Self::ReasonTooShort { min, actual } => json!({
                "minReasonChars": min,
                "reasonChars": actual,
            }),
            Self::Mismatch {
                declared_code,
                declared_excluded,
                inferred_code,
                inferred_excluded,
            } => json!({
                "declared": { "criterionCode": declared_code, "excluded": declared_excluded },
                "inferred": { "criterionCode": inferred_code, "excluded": inferred_excluded },
            }),
            Self::LiveChangeUnconfirmed {
                submission_count,
                linked_brief_count,
            } => json!({
                "submissionCount": submission_count,
                "linkedBriefCount": linked_brief_count,
            }),
        }
    }
}

/// Another brief already holds the lock for this unit and assignment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("brief '{existing_title}' is already locked for assignment {assignment_code}")]
pub struct LockConflict {
    pub existing_brief_id: BriefId,
    pub existing_document_id: DocumentId,
    pub existing_title: String,
    pub unit_id: UnitId,
    pub assignment_code: String,
}

impl LockConflict {
    /// Stable error code
    #[inline]
    #[must_use]
    pub fn code(&self) -> &'static str {
        "BRIEF_ALREADY_LOCKED"
    }

    /// Structured details for the failure envelope
    #[must_use]
    pub fn details(&self) -> Value {
        json!({
            "existingBriefId": self.existing_brief_id.to_string(),
            "existingDocumentId": self.existing_document_id.to_string(),
            "existingTitle": self.existing_title,
            "unitId": self.unit_id.to_string(),
            "assignmentCode": self.assignment_code,
        })
    }
}
