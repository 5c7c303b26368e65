//! Persistence boundary
//!
//! All writes go through [`GovernanceStore::commit`], which applies a
//! [`WriteBatch`] atomically. Every document and brief carries a `revision`;
//! a batch entry must carry the revision it was read at, and the store bumps
//! it on success. Lock uniqueness is re-checked against the post-commit view
//! so two racing lock requests cannot both win.

use crate::error::StoreError;
use baseline_criteria::{BriefId, DocumentId, Unit, UnitId};
use baseline_document::ReferenceDocument;
use baseline_governance::{lock_holders, normalize_assignment_code, AssignmentBrief};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Records to write together
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    documents: Vec<ReferenceDocument>,
    briefs: Vec<AssignmentBrief>,
    units: Vec<Unit>,
    removed_documents: Vec<(DocumentId, u64)>,
    removed_briefs: Vec<(BriefId, u64)>,
}

impl WriteBatch {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (revision 0) or conditionally update a document
    #[must_use]
    pub fn put_document(mut self, document: ReferenceDocument) -> Self {
        self.documents.push(document);
        self
    }

    /// Insert (revision 0) or conditionally update a brief
    #[must_use]
    pub fn put_brief(mut self, brief: AssignmentBrief) -> Self {
        self.briefs.push(brief);
        self
    }

    /// Insert or replace a unit
    #[must_use]
    pub fn put_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    #[must_use]
    pub fn remove_document(mut self, document: &ReferenceDocument) -> Self {
        self.removed_documents.push((document.id, document.revision));
        self
    }

    #[must_use]
    pub fn remove_brief(mut self, brief: &AssignmentBrief) -> Self {
        self.removed_briefs.push((brief.id, brief.revision));
        self
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
            && self.briefs.is_empty()
            && self.units.is_empty()
            && self.removed_documents.is_empty()
            && self.removed_briefs.is_empty()
    }
}

/// Records as stored by a successful commit, with bumped revisions
#[derive(Debug, Clone, Default)]
pub struct Committed {
    pub documents: Vec<ReferenceDocument>,
    pub briefs: Vec<AssignmentBrief>,
    pub units: Vec<Unit>,
}

impl Committed {
    /// Take the stored copy of `id` out of the receipt
    pub fn take_document(&mut self, id: DocumentId) -> Result<ReferenceDocument, StoreError> {
        let index = self
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| StoreError::not_found("document", id))?;
        Ok(self.documents.swap_remove(index))
    }

    /// Take the stored copy of brief `id` out of the receipt
    pub fn take_brief(&mut self, id: BriefId) -> Result<AssignmentBrief, StoreError> {
        let index = self
            .briefs
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| StoreError::not_found("brief", id))?;
        Ok(self.briefs.swap_remove(index))
    }
}

/// Storage for documents, units and briefs
pub trait GovernanceStore: Send + Sync {
    fn document(&self, id: DocumentId) -> Result<ReferenceDocument, StoreError>;

    fn documents(&self) -> Vec<ReferenceDocument>;

    fn unit(&self, id: UnitId) -> Result<Unit, StoreError>;

    fn units(&self) -> Vec<Unit>;

    fn brief(&self, id: BriefId) -> Result<AssignmentBrief, StoreError>;

    fn briefs(&self) -> Vec<AssignmentBrief>;

    /// Apply every write in `batch` or none of them
    fn commit(&self, batch: WriteBatch) -> Result<Committed, StoreError>;

    /// Briefs bound to a unit and assignment code
    fn briefs_for(&self, unit_id: UnitId, assignment_code: &str) -> Vec<AssignmentBrief> {
        self.briefs()
            .into_iter()
            .filter(|brief| brief.targets(unit_id, assignment_code))
            .collect()
    }

    /// Brief bound to a brief document
    fn brief_for_document(&self, document_id: DocumentId) -> Option<AssignmentBrief> {
        self.briefs()
            .into_iter()
            .find(|brief| brief.brief_document_id == document_id)
    }

    /// Unit by code, compared without case or surrounding whitespace
    fn unit_by_code(&self, unit_code: &str) -> Option<Unit> {
        let wanted = unit_code.trim();
        self.units()
            .into_iter()
            .find(|unit| unit.unit_code.trim().eq_ignore_ascii_case(wanted))
    }

    /// Unit imported from a spec document
    fn unit_for_spec(&self, document_id: DocumentId) -> Option<Unit> {
        self.units()
            .into_iter()
            .find(|unit| unit.spec_document_id == Some(document_id))
    }
}

/// Process-local store backed by concurrent maps
///
/// Reads are lock-free; commits are serialized so revision checks and the
/// lock uniqueness check see a stable view.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: DashMap<DocumentId, ReferenceDocument>,
    units: DashMap<UnitId, Unit>,
    briefs: DashMap<BriefId, AssignmentBrief>,
    commit_lock: Mutex<()>,
}

impl InMemoryStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_lock_uniqueness(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        if !batch.briefs.iter().any(AssignmentBrief::holds_lock) {
            return Ok(());
        }

        let mut view: HashMap<BriefId, AssignmentBrief> = self
            .briefs
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        for brief in &batch.briefs {
            view.insert(brief.id, brief.clone());
        }
        for (id, _) in &batch.removed_briefs {
            view.remove(id);
        }

        for brief in batch.briefs.iter().filter(|b| b.holds_lock()) {
            if let Some(holder) =
                lock_holders(brief.unit_id, &brief.assignment_code, brief.id, view.values()).next()
            {
                tracing::warn!(
                    "Rejected commit: brief {} would double-lock {} held by {}",
                    brief.id,
                    brief.assignment_code,
                    holder.id
                );
                return Err(StoreError::DuplicateLock {
                    unit_id: brief.unit_id,
                    assignment_code: normalize_assignment_code(&brief.assignment_code),
                    holder: holder.id,
                });
            }
        }
        Ok(())
    }
}

fn check_revision(
    kind: &'static str,
    id: impl ToString,
    expected: u64,
    current: Option<u64>,
) -> Result<(), StoreError> {
    match current {
        None if expected == 0 => Ok(()),
        None => Err(StoreError::not_found(kind, id)),
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(StoreError::RevisionConflict {
            kind,
            id: id.to_string(),
            expected,
            actual,
        }),
    }
}

fn check_removal(
    kind: &'static str,
    id: impl ToString,
    expected: u64,
    current: Option<u64>,
) -> Result<(), StoreError> {
    match current {
        None => Err(StoreError::not_found(kind, id)),
        Some(_) => check_revision(kind, id, expected, current),
    }
}

impl GovernanceStore for InMemoryStore {
    fn document(&self, id: DocumentId) -> Result<ReferenceDocument, StoreError> {
        self.documents
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("document", id))
    }

    fn documents(&self) -> Vec<ReferenceDocument> {
        self.documents.iter().map(|entry| entry.value().clone()).collect()
    }

    fn unit(&self, id: UnitId) -> Result<Unit, StoreError> {
        self.units
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("unit", id))
    }

    fn units(&self) -> Vec<Unit> {
        self.units.iter().map(|entry| entry.value().clone()).collect()
    }

    fn brief(&self, id: BriefId) -> Result<AssignmentBrief, StoreError> {
        self.briefs
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("brief", id))
    }

    fn briefs(&self) -> Vec<AssignmentBrief> {
        self.briefs.iter().map(|entry| entry.value().clone()).collect()
    }

    fn commit(&self, batch: WriteBatch) -> Result<Committed, StoreError> {
        let _guard = self.commit_lock.lock();

        for document in &batch.documents {
            let current = self.documents.get(&document.id).map(|d| d.revision);
            check_revision("document", document.id, document.revision, current)?;
        }
        for (id, expected) in &batch.removed_documents {
            let current = self.documents.get(id).map(|d| d.revision);
            check_removal("document", id, *expected, current)?;
        }
        for brief in &batch.briefs {
            let current = self.briefs.get(&brief.id).map(|b| b.revision);
            check_revision("brief", brief.id, brief.revision, current)?;
        }
        for (id, expected) in &batch.removed_briefs {
            let current = self.briefs.get(id).map(|b| b.revision);
            check_removal("brief", id, *expected, current)?;
        }
        self.check_lock_uniqueness(&batch)?;

        let mut committed = Committed::default();
        for mut document in batch.documents {
            document.revision += 1;
            self.documents.insert(document.id, document.clone());
            committed.documents.push(document);
        }
        for mut brief in batch.briefs {
            brief.revision += 1;
            self.briefs.insert(brief.id, brief.clone());
            committed.briefs.push(brief);
        }
        for unit in batch.units {
            self.units.insert(unit.id, unit.clone());
            committed.units.push(unit);
        }
        for (id, _) in &batch.removed_documents {
            self.documents.remove(id);
        }
        for (id, _) in &batch.removed_briefs {
            self.briefs.remove(id);
        }

        tracing::debug!(
            documents = committed.documents.len(),
            briefs = committed.briefs.len(),
            units = committed.units.len(),
            "Committed write batch"
        );
        Ok(committed)
    }
}
