//! Governance service
//!
//! Reads records from the store, runs the pure lifecycle and governance
//! rules, then commits the result as one batch and emits audit events.
//! Guards that depend on usage ask the [`UsageOracle`] at call time.

use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, StoreError};
use crate::event::{EventKind, EventSink, GovernanceEvent};
use crate::oracle::UsageOracle;
use crate::store::{GovernanceStore, WriteBatch};
use baseline_criteria::{
    BriefId, CriteriaDiff, CriteriaMatcher, CriteriaView, CriterionCode, CriterionRef, DocumentId,
    GradeBand, Unit, UnitId, UnitStatus,
};
use baseline_document::{
    lifecycle, sha256_hex, DocumentKind, DocumentStatus, DocumentUsage, Draft, ExtractionOutput,
    ReextractRequest, ReferenceDocument, SourceMeta, Transition,
};
use baseline_governance::{
    normalize_assignment_code, resolve_lock, validate_scope_change, AssignmentBrief,
    OverwriteConfirmation, ScopeChangeError, ScopeChangeRequest,
};
use baseline_warnings::{review_task, Equation, TaskReview};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// New file to register
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub kind: DocumentKind,
    pub title: String,
    pub bytes: Vec<u8>,
    pub source_meta: SourceMeta,
}

impl UploadRequest {
    #[must_use]
    pub fn new(kind: DocumentKind, title: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            title: title.into(),
            bytes: bytes.into(),
            source_meta: SourceMeta::default(),
        }
    }

    #[must_use]
    pub fn with_source_meta(mut self, meta: SourceMeta) -> Self {
        self.source_meta = meta;
        self
    }
}

/// Binding and confirmation for a lock request
///
/// Brief documents fall back to the unit and assignment codes found in
/// their metadata or draft when these are not given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LockRequest {
    pub unit_id: Option<UnitId>,
    pub assignment_code: Option<String>,
    pub overwrite: Option<OverwriteConfirmation>,
}

impl LockRequest {
    #[must_use]
    pub fn bound_to(unit_id: UnitId, assignment_code: impl Into<String>) -> Self {
        Self {
            unit_id: Some(unit_id),
            assignment_code: Some(assignment_code.into()),
            overwrite: None,
        }
    }

    /// Confirm replacing the lock held by `existing_brief_id`
    #[must_use]
    pub fn overwriting(mut self, existing_brief_id: BriefId) -> Self {
        self.overwrite = Some(OverwriteConfirmation { existing_brief_id });
        self
    }
}

/// Result of a successful lock
#[derive(Debug, Clone)]
pub struct LockOutcome {
    pub document: ReferenceDocument,
    pub transition: Transition,
    /// Brief now holding the lock (brief documents only)
    pub brief: Option<AssignmentBrief>,
    /// Brief that lost the lock to a confirmed overwrite
    pub superseded: Option<AssignmentBrief>,
}

/// Inbox filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    pub kind: Option<DocumentKind>,
    pub status: Option<DocumentStatus>,
    /// Overrides the configured default when set
    pub include_archived: Option<bool>,
    pub unit_code: Option<String>,
    /// Case-insensitive title substring
    pub search: Option<String>,
}

impl ListQuery {
    fn matches(&self, document: &ReferenceDocument, include_archived: bool) -> bool {
        if document.is_archived() && !include_archived {
            return false;
        }
        if self.kind.is_some_and(|kind| kind != document.kind) {
            return false;
        }
        if self.status.is_some_and(|status| status != document.status()) {
            return false;
        }
        if let Some(unit_code) = self.unit_code.as_deref() {
            let matches_unit = document
                .unit_code()
                .is_some_and(|code| code.trim().eq_ignore_ascii_case(unit_code.trim()));
            if !matches_unit {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref() {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !document.title.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Owned copy of a criterion for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionSummary {
    pub code: CriterionCode,
    pub grade_band: Option<GradeBand>,
    pub description: String,
    pub lo_code: String,
    /// Excluded from grading on the bound brief
    pub excluded: bool,
}

impl CriterionSummary {
    fn from_ref(criterion: &CriterionRef<'_>, excluded: bool) -> Self {
        Self {
            code: criterion.code().clone(),
            grade_band: criterion.criterion.grade_band,
            description: criterion.criterion.description.clone(),
            lo_code: criterion.learning_outcome.lo_code.clone(),
            excluded,
        }
    }
}

/// Criteria listing for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaListing {
    pub unit_id: Option<UnitId>,
    pub view: CriteriaView,
    pub criteria: Vec<CriterionSummary>,
    pub diff: CriteriaDiff,
}

/// Orchestrates governance operations over a store
pub struct GovernanceService {
    config: GovernanceConfig,
    store: Arc<dyn GovernanceStore>,
    usage: Arc<dyn UsageOracle>,
    events: Arc<dyn EventSink>,
}

impl GovernanceService {
    /// Build a service; refuses a config that would disable a guard
    pub fn new(
        config: GovernanceConfig,
        store: Arc<dyn GovernanceStore>,
        usage: Arc<dyn UsageOracle>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            usage,
            events,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn GovernanceStore> {
        &self.store
    }

    /// Register an uploaded file
    ///
    /// The version is one past the highest existing version with the same
    /// kind and title.
    pub fn upload(
        &self,
        request: UploadRequest,
        actor: &str,
    ) -> Result<ReferenceDocument, GovernanceError> {
        let checksum = sha256_hex(&request.bytes);
        let title = request.title.trim().to_string();
        let version = self
            .store
            .documents()
            .iter()
            .filter(|d| d.kind == request.kind && d.title.trim().eq_ignore_ascii_case(&title))
            .map(|d| d.version)
            .max()
            .unwrap_or(0)
            + 1;

        let document = ReferenceDocument::new(request.kind, title, checksum, version, Utc::now())
            .with_source_meta(request.source_meta);
        let id = document.id;
        let document = self
            .store
            .commit(WriteBatch::new().put_document(document))?
            .take_document(id)?;

        tracing::info!("Uploaded {} document {} v{}", document.kind, id, document.version);
        self.emit(
            GovernanceEvent::new(EventKind::DocumentUploaded, actor, id)
                .with_after(Some(document_state(&document))),
        );
        Ok(document)
    }

    /// Store an extraction payload from the producer
    pub fn record_extraction(
        &self,
        document_id: DocumentId,
        payload: &Value,
        request: &ReextractRequest,
        actor: &str,
    ) -> Result<ReferenceDocument, GovernanceError> {
        let mut document = self.store.document(document_id)?;
        let before = document_state(&document);
        let extraction = ExtractionOutput::from_value(payload).into_extraction(document.kind);
        let transition = lifecycle::extract(&mut document, extraction, request, Utc::now())?;
        let document = self
            .store
            .commit(WriteBatch::new().put_document(document))?
            .take_document(document_id)?;

        self.emit(
            GovernanceEvent::new(EventKind::ExtractionRecorded, actor, document_id)
                .with_before(Some(before))
                .with_after(Some(transition_state(&document, &transition))),
        );
        Ok(document)
    }

    /// Record a producer failure
    pub fn record_extraction_failure(
        &self,
        document_id: DocumentId,
        message: &str,
        actor: &str,
    ) -> Result<ReferenceDocument, GovernanceError> {
        let mut document = self.store.document(document_id)?;
        let before = document_state(&document);
        let transition = lifecycle::fail_extraction(&mut document, message, Utc::now())?;
        let document = self
            .store
            .commit(WriteBatch::new().put_document(document))?
            .take_document(document_id)?;

        self.emit(
            GovernanceEvent::new(EventKind::ExtractionFailed, actor, document_id)
                .with_before(Some(before))
                .with_after(Some(transition_state(&document, &transition))),
        );
        Ok(document)
    }

    /// Mark an extraction as reviewed
    pub fn review(
        &self,
        document_id: DocumentId,
        actor: &str,
    ) -> Result<ReferenceDocument, GovernanceError> {
        let mut document = self.store.document(document_id)?;
        let before = document_state(&document);
        lifecycle::review(&mut document, Utc::now())?;
        let document = self
            .store
            .commit(WriteBatch::new().put_document(document))?
            .take_document(document_id)?;

        self.emit(
            GovernanceEvent::new(EventKind::DocumentReviewed, actor, document_id)
                .with_before(Some(before))
                .with_after(Some(document_state(&document))),
        );
        Ok(document)
    }

    /// Materialize a spec draft into a unit
    ///
    /// Re-importing keeps the unit id of an existing unit with the same code,
    /// unless that unit is locked.
    pub fn import_unit(&self, document_id: DocumentId, actor: &str) -> Result<Unit, GovernanceError> {
        let document = self.store.document(document_id)?;
        let Some(Draft::Spec(draft)) = document.extracted_draft() else {
            return Err(match document.kind {
                DocumentKind::Spec => GovernanceError::NotExtracted { document_id },
                other => GovernanceError::WrongKind {
                    document_id,
                    expected: "SPEC",
                    actual: other.to_string(),
                },
            });
        };
        let mut unit = draft
            .to_unit(document_id)
            .ok_or(GovernanceError::NotExtracted { document_id })?;

        let existing = self.store.unit_by_code(&unit.unit_code);
        if let Some(existing) = &existing {
            if existing.status == UnitStatus::Locked {
                return Err(GovernanceError::UnitLocked { unit_id: existing.id });
            }
            unit.id = existing.id;
        }
        if document.is_locked() {
            unit.status = UnitStatus::Locked;
        }

        self.store.commit(WriteBatch::new().put_unit(unit.clone()))?;
        tracing::info!(
            "Imported unit {} from spec {} ({} learning outcomes)",
            unit.unit_code,
            document_id,
            unit.learning_outcomes.len()
        );
        self.emit(
            GovernanceEvent::new(EventKind::UnitImported, actor, unit.id)
                .with_before(existing.map(|u| json!({ "learningOutcomes": u.learning_outcomes.len() })))
                .with_after(Some(json!({
                    "unitCode": unit.unit_code,
                    "learningOutcomes": unit.learning_outcomes.len(),
                    "specDocumentId": document_id.to_string(),
                }))),
        );
        Ok(unit)
    }

    /// Lock a document
    ///
    /// Brief documents are bound to a unit and assignment code and go
    /// through the conflict check; a conflict is returned until the caller
    /// confirms the overwrite by naming the current holder.
    pub fn lock_document(
        &self,
        document_id: DocumentId,
        request: &LockRequest,
        actor: &str,
    ) -> Result<LockOutcome, GovernanceError> {
        let document = self.store.document(document_id)?;
        let usage = self.usage_for(&document);
        match document.kind {
            DocumentKind::Brief => self.lock_brief(document, &usage, request, actor),
            _ => self.lock_reference(document, &usage, actor),
        }
    }

    fn lock_reference(
        &self,
        mut document: ReferenceDocument,
        usage: &DocumentUsage,
        actor: &str,
    ) -> Result<LockOutcome, GovernanceError> {
        let before = document_state(&document);
        let transition = lifecycle::lock(&mut document, usage, None, Utc::now())?;

        let mut batch = WriteBatch::new().put_document(document.clone());
        if document.kind == DocumentKind::Spec {
            if let Some(mut unit) = self.store.unit_for_spec(document.id) {
                unit.status = UnitStatus::Locked;
                batch = batch.put_unit(unit);
            }
        }
        let document = self.store.commit(batch)?.take_document(document.id)?;

        self.emit(
            GovernanceEvent::new(EventKind::DocumentLocked, actor, document.id)
                .with_before(Some(before))
                .with_after(Some(document_state(&document))),
        );
        Ok(LockOutcome {
            document,
            transition,
            brief: None,
            superseded: None,
        })
    }

    fn lock_brief(
        &self,
        mut document: ReferenceDocument,
        usage: &DocumentUsage,
        request: &LockRequest,
        actor: &str,
    ) -> Result<LockOutcome, GovernanceError> {
        let document_id = document.id;
        let unit_id = match request.unit_id {
            Some(unit_id) => self.store.unit(unit_id)?.id,
            None => document
                .unit_code()
                .and_then(|code| self.store.unit_by_code(code))
                .map(|unit| unit.id)
                .ok_or(GovernanceError::BindingRequired { document_id })?,
        };
        let assignment_code = request
            .assignment_code
            .as_deref()
            .or_else(|| document.assignment_code())
            .map(normalize_assignment_code)
            .filter(|code| !code.is_empty())
            .ok_or(GovernanceError::BindingRequired { document_id })?;

        let mut brief = self.store.brief_for_document(document_id).unwrap_or_else(|| {
            AssignmentBrief::new(unit_id, &assignment_code, document_id, document.title.clone())
        });
        brief.unit_id = unit_id;
        brief.assignment_code.clone_from(&assignment_code);
        if brief.criteria_maps.is_empty() {
            if let Some(draft) = document.extracted_draft() {
                brief.criteria_maps = draft.detected_codes().into_iter().collect();
            }
        }

        let candidate = brief.id;
        let competitors = self.store.briefs_for(unit_id, &assignment_code);
        let decision = resolve_lock(
            unit_id,
            &assignment_code,
            candidate,
            &competitors,
            request.overwrite.as_ref(),
        )
        .map_err(|conflict| {
            self.lock_refused(conflict.into(), candidate, document_id, request.overwrite.as_ref(), actor)
        })?;

        let before = document_state(&document);
        let now = Utc::now();
        let transition = lifecycle::lock(&mut document, usage, Some(decision.clearance()), now)?;
        brief.lock(now);
        brief.archived = document.is_archived();

        let mut batch = WriteBatch::new()
            .put_document(document)
            .put_brief(brief.clone());
        let mut previous = None;
        if let Some(previous_id) = decision.superseded() {
            let mut holder = competitors
                .iter()
                .find(|b| b.id == previous_id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("brief", previous_id))?;
            holder.supersede(brief.id);
            batch = batch.put_brief(holder);
            previous = Some(previous_id);
        }

        let mut committed = self.store.commit(batch).map_err(|e| {
            self.lock_refused(e.into(), candidate, document_id, request.overwrite.as_ref(), actor)
        })?;
        let document = committed.take_document(document_id)?;
        let brief = committed.take_brief(candidate)?;
        let superseded = previous.map(|id| committed.take_brief(id)).transpose()?;

        self.emit(
            GovernanceEvent::new(EventKind::DocumentLocked, actor, document_id)
                .with_before(Some(before))
                .with_after(Some(document_state(&document))),
        );
        self.emit(
            GovernanceEvent::new(EventKind::BriefLocked, actor, brief.id).with_after(Some(json!({
                "unitId": unit_id.to_string(),
                "assignmentCode": assignment_code,
                "documentId": document_id.to_string(),
            }))),
        );
        if let Some(old) = &superseded {
            self.emit(
                GovernanceEvent::new(EventKind::BriefSuperseded, actor, old.id)
                    .with_before(Some(json!({ "locked": true })))
                    .with_after(Some(json!({ "supersededBy": brief.id.to_string() }))),
            );
        }

        Ok(LockOutcome {
            document,
            transition,
            brief: Some(brief),
            superseded,
        })
    }

    /// Release a lock; refused while the document is in use
    pub fn unlock(
        &self,
        document_id: DocumentId,
        actor: &str,
    ) -> Result<ReferenceDocument, GovernanceError> {
        let mut document = self.store.document(document_id)?;
        let usage = self.usage_for(&document);
        let before = document_state(&document);
        lifecycle::unlock(&mut document, &usage, Utc::now())?;

        let mut batch = WriteBatch::new().put_document(document);
        if let Some(mut brief) = self.store.brief_for_document(document_id) {
            if brief.is_locked() {
                brief.unlock();
                batch = batch.put_brief(brief);
            }
        }
        if let Some(mut unit) = self.store.unit_for_spec(document_id) {
            if unit.status == UnitStatus::Locked {
                unit.status = UnitStatus::Draft;
                batch = batch.put_unit(unit);
            }
        }
        let document = self.store.commit(batch)?.take_document(document_id)?;

        self.emit(
            GovernanceEvent::new(EventKind::DocumentUnlocked, actor, document_id)
                .with_before(Some(before))
                .with_after(Some(document_state(&document))),
        );
        Ok(document)
    }

    /// Remove an unlocked, unused document and its brief binding
    pub fn delete(&self, document_id: DocumentId, actor: &str) -> Result<(), GovernanceError> {
        let document = self.store.document(document_id)?;
        let usage = self.usage_for(&document);
        lifecycle::ensure_deletable(&document, &usage)?;

        let mut batch = WriteBatch::new().remove_document(&document);
        if let Some(brief) = self.store.brief_for_document(document_id) {
            batch = batch.remove_brief(&brief);
        }
        self.store.commit(batch)?;

        tracing::info!("Deleted document {}", document_id);
        self.emit(
            GovernanceEvent::new(EventKind::DocumentDeleted, actor, document_id)
                .with_before(Some(document_state(&document))),
        );
        Ok(())
    }

    /// Hide from default listings; `Ok(false)` when already archived
    pub fn archive(&self, document_id: DocumentId, actor: &str) -> Result<bool, GovernanceError> {
        self.set_archived(document_id, true, actor)
    }

    /// Show in default listings again; `Ok(false)` when not archived
    pub fn unarchive(&self, document_id: DocumentId, actor: &str) -> Result<bool, GovernanceError> {
        self.set_archived(document_id, false, actor)
    }

    fn set_archived(
        &self,
        document_id: DocumentId,
        archived: bool,
        actor: &str,
    ) -> Result<bool, GovernanceError> {
        let mut document = self.store.document(document_id)?;
        let changed = if archived {
            lifecycle::archive(&mut document)
        } else {
            lifecycle::unarchive(&mut document)
        };
        let brief = self
            .store
            .brief_for_document(document_id)
            .filter(|brief| brief.archived != archived);
        if !changed && brief.is_none() {
            return Ok(false);
        }

        let mut batch = WriteBatch::new();
        if changed {
            batch = batch.put_document(document);
        }
        let brief_id = brief.as_ref().map(|brief| brief.id);
        if let Some(mut brief) = brief {
            brief.archived = archived;
            batch = batch.put_brief(brief);
        }
        self.store.commit(batch).map_err(|e| match brief_id {
            Some(candidate) => self.lock_refused(e.into(), candidate, document_id, None, actor),
            None => e.into(),
        })?;

        let kind = if archived {
            EventKind::DocumentArchived
        } else {
            EventKind::DocumentUnarchived
        };
        self.emit(
            GovernanceEvent::new(kind, actor, document_id)
                .with_before(Some(json!({ "archived": !archived })))
                .with_after(Some(json!({ "archived": archived }))),
        );
        Ok(true)
    }

    /// Documents matching `query`, newest upload first
    #[must_use]
    pub fn list_documents(&self, query: &ListQuery) -> Vec<ReferenceDocument> {
        let include_archived = query
            .include_archived
            .unwrap_or(self.config.include_archived_by_default);
        let mut documents: Vec<ReferenceDocument> = self
            .store
            .documents()
            .into_iter()
            .filter(|d| query.matches(d, include_archived))
            .collect();
        documents.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| b.version.cmp(&a.version))
        });
        documents
    }

    /// Guard flags for destructive actions on a document
    pub fn document_usage(&self, document_id: DocumentId) -> Result<DocumentUsage, GovernanceError> {
        let document = self.store.document(document_id)?;
        Ok(self.usage_for(&document))
    }

    /// Criteria listing for a document's bound unit
    ///
    /// Brief documents bind through their brief, falling back to the unit
    /// code in metadata or draft; spec documents bind to the unit imported
    /// from them.
    pub fn criteria_view(
        &self,
        document_id: DocumentId,
        view: CriteriaView,
    ) -> Result<CriteriaListing, GovernanceError> {
        let document = self.store.document(document_id)?;
        let brief = self.store.brief_for_document(document_id);
        let bound_unit = match (&brief, document.kind) {
            (Some(brief), _) => Some(brief.unit_id),
            (None, DocumentKind::Spec) => self.store.unit_for_spec(document_id).map(|u| u.id),
            (None, _) => document
                .unit_code()
                .and_then(|code| self.store.unit_by_code(code))
                .map(|u| u.id),
        };

        let detected = document
            .extracted_draft()
            .map(Draft::detected_codes)
            .unwrap_or_default();
        let hints = document
            .extracted_draft()
            .map(Draft::learning_outcome_hints)
            .unwrap_or_default();
        let (selected, excluded): (Vec<CriterionCode>, BTreeSet<CriterionCode>) = match &brief {
            Some(brief) => (
                brief.criteria_maps.iter().cloned().collect(),
                brief.excluded_codes().into_iter().collect(),
            ),
            None => (Vec::new(), BTreeSet::new()),
        };

        let units = match bound_unit {
            Some(unit_id) => vec![self.store.unit(unit_id)?],
            None => Vec::new(),
        };
        let matcher = CriteriaMatcher::for_binding(&units, bound_unit);
        let criteria = matcher
            .view(view, &detected, &selected, &hints)
            .iter()
            .map(|c| CriterionSummary::from_ref(c, excluded.contains(c.code())))
            .collect();

        Ok(CriteriaListing {
            unit_id: bound_unit,
            view,
            criteria,
            diff: matcher.diff(&detected),
        })
    }

    /// Exclude or re-include one criterion on a brief
    ///
    /// `next_excluded` is the full exclusion set the caller wants; it must
    /// differ from the current set by exactly the declared criterion.
    pub fn change_grading_scope<S: AsRef<str>>(
        &self,
        brief_id: BriefId,
        next_excluded: &[S],
        request: &ScopeChangeRequest,
        actor: &str,
    ) -> Result<AssignmentBrief, GovernanceError> {
        let mut brief = self.store.brief(brief_id)?;
        let previous = brief.excluded_codes();
        let change = validate_scope_change(
            &previous,
            next_excluded,
            request,
            self.config.min_reason_chars,
        )?;

        let counts = self.usage.usage_counts(brief.brief_document_id);
        let usage = DocumentUsage::new(brief.is_locked(), counts);
        if usage.in_use
            && self.config.require_live_change_confirmation
            && !change.confirm_live_change()
        {
            tracing::info!(
                "Scope change on brief {} needs live confirmation ({} submissions)",
                brief_id,
                counts.submission_count
            );
            return Err(ScopeChangeError::LiveChangeUnconfirmed {
                submission_count: counts.submission_count,
                linked_brief_count: counts.linked_brief_count,
            }
            .into());
        }

        #[allow(clippy::cast_precision_loss)]
        let graded = counts.submission_count as f64;
        brief.exclusions = brief.exclusions.apply_change(
            &change,
            actor,
            Utc::now(),
            graded,
            self.config.exclusion_log_capacity,
        );
        let brief = self
            .store
            .commit(WriteBatch::new().put_brief(brief))?
            .take_brief(brief_id)?;

        tracing::info!(
            "Brief {}: {} {} ({})",
            brief_id,
            if change.excluded() { "excluded" } else { "re-included" },
            change.criterion_code(),
            actor
        );
        self.emit(
            GovernanceEvent::new(EventKind::GradingScopeChanged, actor, brief_id)
                .with_before(Some(json!({ "excluded": change.previous_excluded() })))
                .with_after(Some(json!({
                    "excluded": change.next_excluded(),
                    "criterionCode": change.criterion_code(),
                    "reason": change.reason(),
                }))),
        );
        Ok(brief)
    }

    /// Effective warnings and confidence for every task of a brief draft
    pub fn review_tasks(
        &self,
        document_id: DocumentId,
        overrides: &HashMap<String, String>,
    ) -> Result<Vec<TaskReview>, GovernanceError> {
        let document = self.store.document(document_id)?;
        let Some(Draft::Brief(draft)) = document.extracted_draft() else {
            return Err(match document.kind {
                DocumentKind::Brief => GovernanceError::NotExtracted { document_id },
                other => GovernanceError::WrongKind {
                    document_id,
                    expected: "BRIEF",
                    actual: other.to_string(),
                },
            });
        };

        let equations_by_id: HashMap<String, Equation> = draft
            .equations
            .iter()
            .chain(draft.tasks.iter().flat_map(|task| task.equations.iter()))
            .map(|eq| (eq.id.clone(), eq.clone()))
            .collect();
        Ok(draft
            .tasks
            .iter()
            .map(|task| review_task(task, &equations_by_id, overrides))
            .collect())
    }

    fn usage_for(&self, document: &ReferenceDocument) -> DocumentUsage {
        DocumentUsage::for_document(document, self.usage.usage_counts(document.id))
    }

    /// Audit a refused lock, then hand the error back
    ///
    /// Only lock conflicts are recorded; any other error passes through.
    fn lock_refused(
        &self,
        err: GovernanceError,
        candidate: BriefId,
        document_id: DocumentId,
        confirmation: Option<&OverwriteConfirmation>,
        actor: &str,
    ) -> GovernanceError {
        if !matches!(
            err,
            GovernanceError::LockConflict(_) | GovernanceError::Store(StoreError::DuplicateLock { .. })
        ) {
            return err;
        }
        tracing::info!("Lock refused for brief {} on document {}: {}", candidate, document_id, err);
        let mut after = err.details();
        after["candidateBriefId"] = Value::String(candidate.to_string());
        after["error"] = Value::String(err.code().to_string());
        if let Some(confirmation) = confirmation {
            after["confirmedBriefId"] = Value::String(confirmation.existing_brief_id.to_string());
        }
        self.emit(
            GovernanceEvent::new(EventKind::BriefLockConflict, actor, document_id)
                .with_after(Some(after)),
        );
        err
    }

    fn emit(&self, event: GovernanceEvent) {
        let kind = event.kind;
        if let Err(e) = self.events.record(event) {
            tracing::warn!("Event sink rejected {}: {}", kind, e);
        }
    }
}

fn document_state(document: &ReferenceDocument) -> Value {
    json!({
        "status": document.status(),
        "lockedAt": document.locked_at(),
        "archived": document.is_archived(),
        "version": document.version,
    })
}

fn transition_state(document: &ReferenceDocument, transition: &Transition) -> Value {
    let mut state = document_state(document);
    if let Some(note) = &transition.note {
        state["note"] = Value::String(note.clone());
    }
    state["warnings"] = json!(document.extraction_warnings());
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RecordingSink;
    use crate::oracle::MockUsageOracle;
    use crate::store::InMemoryStore;
    use baseline_document::UsageCounts;
    use pretty_assertions::assert_eq;

    fn service_with(usage: MockUsageOracle) -> (GovernanceService, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let service = GovernanceService::new(
            GovernanceConfig::new(),
            Arc::new(InMemoryStore::new()),
            Arc::new(usage),
            sink.clone(),
        )
        .unwrap();
        (service, sink)
    }

    fn unused() -> MockUsageOracle {
        let mut usage = MockUsageOracle::new();
        usage.expect_usage_counts().returning(|_| UsageCounts::default());
        usage
    }

    fn extracted_brief(service: &GovernanceService, title: &str) -> ReferenceDocument {
        let doc = service
            .upload(UploadRequest::new(DocumentKind::Brief, title, title.as_bytes()), "tutor")
            .unwrap();
        service
            .record_extraction(
                doc.id,
                &json!({
                    "kind": "BRIEF",
                    "unitCodeGuess": "4017",
                    "assignmentCode": "A1",
                    "detectedCriterionCodes": ["P1", "p2", "M1"],
                }),
                &ReextractRequest::default(),
                "tutor",
            )
            .unwrap()
    }

    fn seed_unit(service: &GovernanceService) -> Unit {
        let unit = Unit::new("4017", "Engineering Principles");
        service
            .store()
            .commit(WriteBatch::new().put_unit(unit.clone()))
            .unwrap();
        unit
    }

    #[test]
    fn upload_numbers_versions_per_title() {
        let (service, sink) = service_with(unused());
        let a = service
            .upload(UploadRequest::new(DocumentKind::Spec, "Unit 4017", "one"), "t")
            .unwrap();
        let b = service
            .upload(UploadRequest::new(DocumentKind::Spec, "unit 4017 ", "two"), "t")
            .unwrap();
        let c = service
            .upload(UploadRequest::new(DocumentKind::Brief, "Unit 4017", "x"), "t")
            .unwrap();
        assert_eq!((a.version, b.version, c.version), (1, 2, 1));
        assert_eq!(a.checksum, sha256_hex(b"one"));
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn brief_lock_binds_from_draft() {
        let (service, sink) = service_with(unused());
        let unit = seed_unit(&service);
        let doc = extracted_brief(&service, "A1 Forces");

        let outcome = service.lock_document(doc.id, &LockRequest::default(), "lead").unwrap();
        let brief = outcome.brief.unwrap();
        assert_eq!(brief.unit_id, unit.id);
        assert_eq!(brief.assignment_code, "A1");
        assert_eq!(brief.criteria_maps.len(), 3);
        assert!(outcome.document.is_locked());
        assert!(sink.kinds().contains(&EventKind::BriefLocked));
    }

    #[test]
    fn brief_lock_without_binding_is_refused() {
        let (service, _) = service_with(unused());
        let doc = extracted_brief(&service, "A1 Forces");
        let err = service
            .lock_document(doc.id, &LockRequest::default(), "lead")
            .unwrap_err();
        assert_eq!(err.code(), "BRIEF_BINDING_REQUIRED");
        assert!(!service.store().document(doc.id).unwrap().is_locked());
    }

    #[test]
    fn unlock_refused_while_in_use() {
        let mut usage = MockUsageOracle::new();
        usage
            .expect_usage_counts()
            .returning(|_| UsageCounts::new(4, 0));
        let (service, _) = service_with(usage);
        seed_unit(&service);
        let doc = extracted_brief(&service, "A1 Forces");
        service.lock_document(doc.id, &LockRequest::default(), "lead").unwrap();

        let err = service.unlock(doc.id, "lead").unwrap_err();
        assert_eq!(err.code(), "BRIEF_IN_USE");
        assert_eq!(err.details()["submissionCount"], 4);
        assert!(!service.document_usage(doc.id).unwrap().can_unlock);
    }

    #[test]
    fn live_scope_change_needs_confirmation() {
        let mut usage = MockUsageOracle::new();
        usage
            .expect_usage_counts()
            .returning(|_| UsageCounts::new(2, 0));
        let (service, _) = service_with(usage);
        seed_unit(&service);
        let doc = extracted_brief(&service, "A1 Forces");
        let brief = service
            .lock_document(doc.id, &LockRequest::default(), "lead")
            .unwrap()
            .brief
            .unwrap();

        let request = ScopeChangeRequest::exclude("M1", "Task 2 withdrawn this year");
        let err = service
            .change_grading_scope(brief.id, &["M1"], &request, "lead")
            .unwrap_err();
        assert_eq!(err.code(), "BRIEF_CRITERIA_SCOPE_CHANGE_CONFIRM_REQUIRED");
        assert!(err.requires_confirmation());

        let brief = service
            .change_grading_scope(brief.id, &["M1"], &request.confirmed_live(), "lead")
            .unwrap();
        assert_eq!(brief.exclusions.log()[0].graded_submission_count, 2);
    }

    #[test]
    fn review_tasks_requires_brief_draft() {
        let (service, _) = service_with(unused());
        let spec = service
            .upload(UploadRequest::new(DocumentKind::Spec, "Spec", "s"), "t")
            .unwrap();
        let err = service.review_tasks(spec.id, &HashMap::new()).unwrap_err();
        assert_eq!(err.code(), "DOCUMENT_WRONG_KIND");

        let brief = service
            .upload(UploadRequest::new(DocumentKind::Brief, "Brief", "b"), "t")
            .unwrap();
        let err = service.review_tasks(brief.id, &HashMap::new()).unwrap_err();
        assert_eq!(err.code(), "DOCUMENT_NOT_EXTRACTED");
    }

    #[test]
    fn invalid_config_is_refused() {
        for config in [
            GovernanceConfig::new().with_min_reason_chars(0),
            GovernanceConfig::new().with_exclusion_log_capacity(0),
        ] {
            let result = GovernanceService::new(
                config,
                Arc::new(InMemoryStore::new()),
                Arc::new(unused()),
                Arc::new(RecordingSink::new()),
            );
            let Err(err) = result else {
                panic!("service accepted a config with a disabled guard");
            };
            assert_eq!(err.code(), "CONFIG_INVALID");
        }
    }

    #[test]
    fn missing_document_is_not_found() {
        let (service, _) = service_with(unused());
        let err = service.review(DocumentId::new(), "t").unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
