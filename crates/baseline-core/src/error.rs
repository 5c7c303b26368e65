//! Error types for the governance service
//!
//! Collects the per-concern errors of the lower crates:
//! - Document lifecycle guards
//! - Lock conflicts and scope-change refusals
//! - Store revision and uniqueness failures
//! - Configuration loading
//!
//! Every error maps to a stable code and a `{ok, error, message, details}`
//! failure envelope.

use baseline_criteria::{BriefId, DocumentId, UnitId};
use baseline_document::LifecycleError;
use baseline_governance::{LockConflict, ScopeChangeError};
use serde::Serialize;
use serde_json::{json, Value};

/// Main governance error type
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    /// Document lifecycle guard refused the action
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Another brief holds the lock
    #[error(transparent)]
    LockConflict(#[from] LockConflict),

    /// Scope change refused
    #[error(transparent)]
    ScopeChange(#[from] ScopeChangeError),

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Brief lock without a resolvable unit and assignment code
    #[error("brief document {document_id} needs a unit and assignment code before locking")]
    BindingRequired { document_id: DocumentId },

    /// Operation applies to another document kind
    #[error("document {document_id} is a {actual} document; expected {expected}")]
    WrongKind {
        document_id: DocumentId,
        expected: &'static str,
        actual: String,
    },

    /// Operation needs an extraction that has not happened yet
    #[error("document {document_id} has no extracted draft")]
    NotExtracted { document_id: DocumentId },

    /// Unit criteria are frozen by a locked spec
    #[error("unit {unit_id} is locked; unlock its spec before re-importing")]
    UnitLocked { unit_id: UnitId },
}

impl GovernanceError {
    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Lifecycle(e) => e.code(),
            Self::LockConflict(e) => e.code(),
            Self::ScopeChange(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Config(_) => "CONFIG_INVALID",
            Self::BindingRequired { .. } => "BRIEF_BINDING_REQUIRED",
            Self::WrongKind { .. } => "DOCUMENT_WRONG_KIND",
            Self::NotExtracted { .. } => "DOCUMENT_NOT_EXTRACTED",
            Self::UnitLocked { .. } => "UNIT_LOCKED",
        }
    }

    /// Structured details for the failure envelope
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::Lifecycle(LifecycleError::InUse {
                submission_count,
                linked_brief_count,
            }) => json!({
                "submissionCount": submission_count,
                "linkedBriefCount": linked_brief_count,
            }),
            Self::Lifecycle(LifecycleError::InvalidTransition { action, from }) => json!({
                "action": action.to_string(),
                "status": from.to_string(),
            }),
            Self::Lifecycle(_) | Self::Config(_) => Value::Null,
            Self::LockConflict(e) => e.details(),
            Self::ScopeChange(e) => e.details(),
            Self::Store(e) => e.details(),
            Self::BindingRequired { document_id } | Self::NotExtracted { document_id } => {
                json!({ "documentId": document_id.to_string() })
            }
            Self::UnitLocked { unit_id } => json!({ "unitId": unit_id.to_string() }),
            Self::WrongKind {
                document_id,
                expected,
                actual,
            } => json!({
                "documentId": document_id.to_string(),
                "expected": expected,
                "actual": actual,
            }),
        }
    }

    /// Caller must confirm and resend
    #[inline]
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            Self::LockConflict(_) | Self::ScopeChange(ScopeChangeError::LiveChangeUnconfirmed { .. })
        )
    }

    /// Re-reading and retrying the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::RevisionConflict { .. }))
    }

    /// Wire shape for refusals
    #[must_use]
    pub fn to_failure(&self) -> Failure {
        Failure {
            ok: false,
            error: self.code(),
            message: self.to_string(),
            details: self.details(),
        }
    }
}

/// `{ok:false, error, message, details}` envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub ok: bool,
    pub error: &'static str,
    pub message: String,
    pub details: Value,
}

impl From<&GovernanceError> for Failure {
    fn from(error: &GovernanceError) -> Self {
        error.to_failure()
    }
}

/// Persistence errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Record does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Record changed since it was read
    #[error("{kind} {id} was modified concurrently (expected revision {expected}, found {actual})")]
    RevisionConflict {
        kind: &'static str,
        id: String,
        expected: u64,
        actual: u64,
    },

    /// Write would leave two locked briefs for one unit and assignment
    #[error("assignment {assignment_code} already has locked brief {holder}")]
    DuplicateLock {
        unit_id: UnitId,
        assignment_code: String,
        holder: BriefId,
    },
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::RevisionConflict { .. } => "REVISION_CONFLICT",
            Self::DuplicateLock { .. } => "BRIEF_ALREADY_LOCKED",
        }
    }

    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::NotFound { kind, id } => json!({ "kind": kind, "id": id }),
            Self::RevisionConflict {
                kind,
                id,
                expected,
                actual,
            } => json!({
                "kind": kind,
                "id": id,
                "expectedRevision": expected,
                "actualRevision": actual,
            }),
            Self::DuplicateLock {
                unit_id,
                assignment_code,
                holder,
            } => json!({
                "unitId": unit_id.to_string(),
                "assignmentCode": assignment_code,
                "existingBriefId": holder.to_string(),
            }),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
