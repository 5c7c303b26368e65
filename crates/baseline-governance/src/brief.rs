//! Assignment brief record

use crate::audit::ExclusionLedger;
use baseline_criteria::{BriefId, CriterionCode, DocumentId, UnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical form of an assignment code (`a1 ` becomes `A1`)
#[must_use]
pub fn normalize_assignment_code(code: &str) -> String {
    code.split_whitespace().collect::<String>().to_ascii_uppercase()
}

/// Binding between a unit, an assignment code and a brief document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentBrief {
    pub id: BriefId,
    pub unit_id: UnitId,
    pub assignment_code: String,
    pub brief_document_id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub archived: bool,
    pub locked_at: Option<DateTime<Utc>>,
    /// Brief that took over the lock from this one
    #[serde(default)]
    pub superseded_by: Option<BriefId>,
    /// Criteria the brief claims to assess
    #[serde(default)]
    pub criteria_maps: BTreeSet<CriterionCode>,
    #[serde(rename = "sourceMeta", default)]
    pub exclusions: ExclusionLedger,
    #[serde(default)]
    pub revision: u64,
}

impl AssignmentBrief {
    /// Unlocked, unarchived brief bound to `brief_document_id`
    #[must_use]
    pub fn new(
        unit_id: UnitId,
        assignment_code: &str,
        brief_document_id: DocumentId,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: BriefId::new(),
            unit_id,
            assignment_code: normalize_assignment_code(assignment_code),
            brief_document_id,
            title: title.into(),
            archived: false,
            locked_at: None,
            superseded_by: None,
            criteria_maps: BTreeSet::new(),
            exclusions: ExclusionLedger::new(),
            revision: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_criteria<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = CriterionCode>,
    {
        self.criteria_maps.extend(codes);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked_at.is_some()
    }

    /// Same unit and assignment as `unit_id` / `assignment_code`
    #[must_use]
    pub fn targets(&self, unit_id: UnitId, assignment_code: &str) -> bool {
        self.unit_id == unit_id
            && normalize_assignment_code(&self.assignment_code)
                == normalize_assignment_code(assignment_code)
    }

    /// Holds the lock for its unit and assignment
    #[inline]
    #[must_use]
    pub fn holds_lock(&self) -> bool {
        self.is_locked() && !self.archived
    }

    /// Currently excluded codes, sorted
    #[must_use]
    pub fn excluded_codes(&self) -> Vec<CriterionCode> {
        self.exclusions.reasons().keys().cloned().collect()
    }

    /// Criteria still graded after exclusions
    #[must_use]
    pub fn graded_criteria(&self) -> BTreeSet<CriterionCode> {
        self.criteria_maps
            .iter()
            .filter(|code| self.exclusions.reason_for(code).is_none())
            .cloned()
            .collect()
    }

    pub fn lock(&mut self, now: DateTime<Utc>) {
        self.locked_at = Some(now);
        self.superseded_by = None;
    }

    pub fn unlock(&mut self) {
        self.locked_at = None;
    }

    /// Release the lock in favour of `successor`
    pub fn supersede(&mut self, successor: BriefId) {
        self.locked_at = None;
        self.superseded_by = Some(successor);
        tracing::info!("Brief {} superseded by {}", self.id, successor);
    }
}
