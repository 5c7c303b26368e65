//! Document lifecycle engine
//!
//! Pure guard-and-transition logic over a single [`ReferenceDocument`]:
//! - extraction (including forced re-extraction of a locked document)
//! - review, lock and unlock
//! - delete guard
//! - archive/unarchive (metadata only)
//!
//! Each successful transition returns a [`Transition`] for the audit sink.
//! Expected refusals are [`LifecycleError`] values, never panics.

use crate::document::{DocumentKind, DocumentStatus, ReferenceDocument};
use crate::draft::Extraction;
use crate::error::LifecycleError;
use crate::state_machine::validate_transition;
use crate::usage::DocumentUsage;
use baseline_criteria::{DocumentId, UnitId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Action requested on a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleAction {
    Extract,
    FailExtraction,
    Review,
    Lock,
    Unlock,
    Delete,
    Archive,
    Unarchive,
}

impl Display for LifecycleAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extract => "extract",
            Self::FailExtraction => "record a failed extraction for",
            Self::Review => "review",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Delete => "delete",
            Self::Archive => "archive",
            Self::Unarchive => "unarchive",
        })
    }
}

/// Options for (re-)extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReextractRequest {
    /// Must be set to re-extract a locked document
    pub force: bool,
    /// Audit note, required with `force`
    pub reason: Option<String>,
}

impl ReextractRequest {
    /// Forced re-extraction with an audit note
    #[must_use]
    pub fn forced(reason: impl Into<String>) -> Self {
        Self {
            force: true,
            reason: Some(reason.into()),
        }
    }
}

/// Evidence that the lock conflict check ran for a brief
///
/// Issued by the lock conflict resolver; brief documents cannot be locked
/// without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictClearance {
    pub unit_id: UnitId,
    pub assignment_code: String,
}

/// Record of an accepted transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub document_id: DocumentId,
    pub action: LifecycleAction,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub at: DateTime<Utc>,
    /// Free-text audit note (forced re-extract reason, failure message)
    pub note: Option<String>,
}

impl Transition {
    fn new(
        document: &ReferenceDocument,
        action: LifecycleAction,
        from: DocumentStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            document_id: document.id,
            action,
            from,
            to: document.status(),
            at,
            note: None,
        }
    }

    fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

/// Store a new extraction
///
/// Non-locked documents move to `EXTRACTED`. A locked document stays locked
/// and keeps its `locked_at`, but only with explicit force and a reason.
pub fn extract(
    document: &mut ReferenceDocument,
    extraction: Extraction,
    request: &ReextractRequest,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    let from = document.status();
    let (to, note) = if from == DocumentStatus::Locked {
        if !request.force {
            return Err(LifecycleError::LockedReextractRequiresForce);
        }
        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(LifecycleError::ReextractReasonRequired)?;
        (DocumentStatus::Locked, Some(reason.to_string()))
    } else {
        (DocumentStatus::Extracted, None)
    };

    validate_transition(LifecycleAction::Extract, from, to)?;
    document.replace_extraction(extraction.draft, extraction.warnings);
    document.set_status(to, now);

    if note.is_some() {
        tracing::warn!("Forced re-extraction of locked document {}", document.id);
    } else {
        tracing::debug!("Extracted document {}: {} -> {}", document.id, from, to);
    }
    Ok(Transition::new(document, LifecycleAction::Extract, from, now).with_note(note))
}

/// Record a failed extraction
pub fn fail_extraction(
    document: &mut ReferenceDocument,
    message: impl Into<String>,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    let from = document.status();
    validate_transition(LifecycleAction::FailExtraction, from, DocumentStatus::Failed)?;
    let message = message.into();
    document.record_failure(message.clone());
    document.set_status(DocumentStatus::Failed, now);

    tracing::warn!("Extraction failed for document {}: {}", document.id, message);
    Ok(Transition::new(document, LifecycleAction::FailExtraction, from, now).with_note(Some(message)))
}

/// Mark the draft as reviewed
pub fn review(
    document: &mut ReferenceDocument,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    let from = document.status();
    validate_transition(LifecycleAction::Review, from, DocumentStatus::Reviewed)?;
    document.set_status(DocumentStatus::Reviewed, now);
    Ok(Transition::new(document, LifecycleAction::Review, from, now))
}

/// Freeze the draft as authoritative
///
/// Only from `EXTRACTED` or `REVIEWED`. Brief documents need a
/// [`ConflictClearance`] from the lock conflict resolver.
pub fn lock(
    document: &mut ReferenceDocument,
    usage: &DocumentUsage,
    clearance: Option<&ConflictClearance>,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    let from = document.status();
    validate_transition(LifecycleAction::Lock, from, DocumentStatus::Locked)?;
    if document.kind == DocumentKind::Brief && clearance.is_none() {
        return Err(LifecycleError::ConflictCheckRequired);
    }

    document.set_status(DocumentStatus::Locked, now);
    tracing::info!(
        submissions = usage.submission_count,
        "Locked document {} ({})",
        document.id,
        document.kind
    );
    Ok(Transition::new(document, LifecycleAction::Lock, from, now))
}

/// Release a lock
///
/// Refused while anything references the document.
pub fn unlock(
    document: &mut ReferenceDocument,
    usage: &DocumentUsage,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    let from = document.status();
    if from != DocumentStatus::Locked {
        return Err(LifecycleError::InvalidTransition {
            action: LifecycleAction::Unlock,
            from,
        });
    }
    if usage.in_use {
        tracing::info!("Unlock refused for document {}: in use", document.id);
        return Err(in_use(usage));
    }
    validate_transition(LifecycleAction::Unlock, from, DocumentStatus::Extracted)?;
    document.set_status(DocumentStatus::Extracted, now);
    Ok(Transition::new(document, LifecycleAction::Unlock, from, now))
}

/// Check that the document may be removed
pub fn ensure_deletable(
    document: &ReferenceDocument,
    usage: &DocumentUsage,
) -> Result<(), LifecycleError> {
    if document.is_locked() {
        return Err(LifecycleError::DeleteLocked);
    }
    if usage.in_use {
        return Err(in_use(usage));
    }
    Ok(())
}

/// Hide from default listings; returns whether anything changed
pub fn archive(document: &mut ReferenceDocument) -> bool {
    set_archived(document, true)
}

/// Show in default listings again; returns whether anything changed
pub fn unarchive(document: &mut ReferenceDocument) -> bool {
    set_archived(document, false)
}

fn set_archived(document: &mut ReferenceDocument, archived: bool) -> bool {
    let changed = document.source_meta.archived != archived;
    document.source_meta.archived = archived;
    changed
}

fn in_use(usage: &DocumentUsage) -> LifecycleError {
    LifecycleError::InUse {
        submission_count: usage.submission_count,
        linked_brief_count: usage.linked_brief_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{BriefDraft, Draft};
    use crate::usage::UsageCounts;
    use baseline_criteria::UnitId;

    fn brief() -> ReferenceDocument {
        ReferenceDocument::new(DocumentKind::Brief, "A1 brief", "sum", 1, Utc::now())
    }

    fn spec() -> ReferenceDocument {
        ReferenceDocument::new(DocumentKind::Spec, "Unit spec", "sum", 1, Utc::now())
    }

    fn extraction(warning: &str) -> Extraction {
        Extraction {
            draft: Draft::Brief(BriefDraft::default()),
            warnings: vec![warning.to_string()],
        }
    }

    fn clearance() -> ConflictClearance {
        ConflictClearance {
            unit_id: UnitId::new(),
            assignment_code: "A1".to_string(),
        }
    }

    fn locked_brief() -> ReferenceDocument {
        let mut doc = brief();
        extract(&mut doc, extraction("first"), &ReextractRequest::default(), Utc::now()).unwrap();
        lock(&mut doc, &DocumentUsage::unused(false), Some(&clearance()), Utc::now()).unwrap();
        doc
    }

    #[test]
    fn extract_moves_uploaded_to_extracted() {
        let mut doc = brief();
        let t = extract(&mut doc, extraction("w"), &ReextractRequest::default(), Utc::now()).unwrap();
        assert_eq!(t.from, DocumentStatus::Uploaded);
        assert_eq!(t.to, DocumentStatus::Extracted);
        assert_eq!(doc.extraction_warnings(), ["w".to_string()]);
    }

    #[test]
    fn lock_requires_extracted_or_reviewed() {
        let mut doc = spec();
        let err = lock(&mut doc, &DocumentUsage::unused(false), None, Utc::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { action: LifecycleAction::Lock, .. }));

        extract(&mut doc, extraction("w"), &ReextractRequest::default(), Utc::now()).unwrap();
        review(&mut doc, Utc::now()).unwrap();
        lock(&mut doc, &DocumentUsage::unused(false), None, Utc::now()).unwrap();
        assert!(doc.is_locked());
        assert!(doc.locked_at().is_some());
    }

    #[test]
    fn brief_lock_requires_conflict_clearance() {
        let mut doc = brief();
        extract(&mut doc, extraction("w"), &ReextractRequest::default(), Utc::now()).unwrap();
        let err = lock(&mut doc, &DocumentUsage::unused(false), None, Utc::now()).unwrap_err();
        assert_eq!(err, LifecycleError::ConflictCheckRequired);
        assert_eq!(doc.status(), DocumentStatus::Extracted);
    }

    #[test]
    fn locking_twice_is_refused() {
        let mut doc = locked_brief();
        let err = lock(&mut doc, &DocumentUsage::unused(true), Some(&clearance()), Utc::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn reextract_locked_needs_force_and_reason() {
        let mut doc = locked_brief();
        let locked_at = doc.locked_at();

        let err = extract(&mut doc, extraction("second"), &ReextractRequest::default(), Utc::now())
            .unwrap_err();
        assert_eq!(err, LifecycleError::LockedReextractRequiresForce);

        let no_reason = ReextractRequest {
            force: true,
            reason: Some("   ".to_string()),
        };
        let err = extract(&mut doc, extraction("second"), &no_reason, Utc::now()).unwrap_err();
        assert_eq!(err, LifecycleError::ReextractReasonRequired);
        assert_eq!(doc.extraction_warnings(), ["first".to_string()]);

        let t = extract(
            &mut doc,
            extraction("second"),
            &ReextractRequest::forced("Better OCR pass"),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(t.to, DocumentStatus::Locked);
        assert_eq!(t.note.as_deref(), Some("Better OCR pass"));
        assert_eq!(doc.locked_at(), locked_at);
        assert_eq!(doc.extraction_warnings(), ["second".to_string()]);
    }

    #[test]
    fn unlock_refused_while_in_use() {
        let mut doc = locked_brief();
        let busy = DocumentUsage::new(true, UsageCounts::new(3, 1));
        let err = unlock(&mut doc, &busy, Utc::now()).unwrap_err();
        assert_eq!(err.code(), "BRIEF_IN_USE");
        assert!(doc.is_locked());

        unlock(&mut doc, &DocumentUsage::unused(true), Utc::now()).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Extracted);
        assert!(doc.locked_at().is_none());
    }

    #[test]
    fn unlock_requires_locked() {
        let mut doc = brief();
        assert!(unlock(&mut doc, &DocumentUsage::unused(false), Utc::now()).is_err());
    }

    #[test]
    fn delete_guards() {
        let doc = locked_brief();
        assert_eq!(
            ensure_deletable(&doc, &DocumentUsage::unused(true)),
            Err(LifecycleError::DeleteLocked)
        );

        let doc = brief();
        let busy = DocumentUsage::new(false, UsageCounts::new(0, 1));
        assert_eq!(ensure_deletable(&doc, &busy).unwrap_err().code(), "BRIEF_IN_USE");
        assert!(ensure_deletable(&doc, &DocumentUsage::unused(false)).is_ok());
    }

    #[test]
    fn archive_is_idempotent_and_orthogonal() {
        let mut doc = locked_brief();
        assert!(archive(&mut doc));
        assert!(doc.is_archived());
        assert!(!archive(&mut doc));
        assert!(doc.is_archived());
        assert!(doc.is_locked());

        assert!(unarchive(&mut doc));
        assert!(!doc.is_archived());
    }

    #[test]
    fn failure_then_retry() {
        let mut doc = spec();
        let t = fail_extraction(&mut doc, "timeout", Utc::now()).unwrap();
        assert_eq!(t.to, DocumentStatus::Failed);
        assert_eq!(doc.last_error(), Some("timeout"));

        extract(&mut doc, extraction("w"), &ReextractRequest::default(), Utc::now()).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Extracted);
        assert!(doc.last_error().is_none());
    }

    #[test]
    fn failure_recorded_after_review() {
        let mut doc = spec();
        extract(&mut doc, extraction("w"), &ReextractRequest::default(), Utc::now()).unwrap();
        review(&mut doc, Utc::now()).unwrap();
        let t = fail_extraction(&mut doc, "second pass timed out", Utc::now()).unwrap();
        assert_eq!(t.from, DocumentStatus::Reviewed);
        assert_eq!(doc.status(), DocumentStatus::Failed);
    }

    #[test]
    fn failure_not_recorded_on_locked_document() {
        let mut doc = locked_brief();
        assert!(fail_extraction(&mut doc, "timeout", Utc::now()).is_err());
        assert!(doc.is_locked());
    }
}
