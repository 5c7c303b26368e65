//! Error types for the document lifecycle
//!
//! Every expected business condition is a variant here; callers branch on
//! [`LifecycleError::code`] and show the `Display` text to a human.

use crate::document::DocumentStatus;
use crate::lifecycle::LifecycleAction;

/// Lifecycle guard failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Status does not allow the requested action
    #[error("cannot {action} a document in status {from}")]
    InvalidTransition {
        /// Requested action
        action: LifecycleAction,
        /// Current status
        from: DocumentStatus,
    },

    /// Re-extracting a locked document without explicit force
    #[error("document is locked; re-extraction requires explicit force and a reason")]
    LockedReextractRequiresForce,

    /// Forced re-extraction without an audit note
    #[error("forced re-extraction of a locked document requires a reason")]
    ReextractReasonRequired,

    /// Deleting a locked document
    #[error("document is locked; unlock it before deleting")]
    DeleteLocked,

    /// Submissions or briefs still reference the document
    #[error(
        "document is in use by {submission_count} submission(s) and {linked_brief_count} brief(s)"
    )]
    InUse {
        /// Submissions graded against the document
        submission_count: u64,
        /// Briefs linked to the document
        linked_brief_count: u64,
    },

    /// Brief lock attempted without running the conflict check
    #[error("brief documents can only be locked after the lock conflict check")]
    ConflictCheckRequired,

    /// Persisted record violates a document invariant
    #[error("invalid document record: {0}")]
    InvalidRecord(String),
}

impl LifecycleError {
    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "DOCUMENT_INVALID_TRANSITION",
            Self::LockedReextractRequiresForce | Self::DeleteLocked => "DOCUMENT_LOCKED",
            Self::ReextractReasonRequired => "DOCUMENT_REEXTRACT_REASON_REQUIRED",
            Self::InUse { .. } => "BRIEF_IN_USE",
            Self::ConflictCheckRequired => "BRIEF_CONFLICT_CHECK_REQUIRED",
            Self::InvalidRecord(_) => "DOCUMENT_INVALID_RECORD",
        }
    }

    /// Caller can fix the request and retry without changing other records
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::LockedReextractRequiresForce
                | Self::ReextractReasonRequired
                | Self::ConflictCheckRequired
        )
    }
}
