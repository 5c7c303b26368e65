//! Criteria matching against a linked unit
//!
//! Reconciles machine-detected codes with the canonical criteria of the unit
//! a document is bound to, and produces the focused and full views used for
//! mapping review.
//!
//! # Ordering
//! Every listing sorts by band rank (`PASS`, `MERIT`, `DISTINCTION`, other)
//! then by canonical code as a string. Grouped listings group by `loCode`.

use crate::code::CriterionCode;
use crate::ids::UnitId;
use crate::unit::{CriterionRef, LearningOutcome, Unit};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Which listing the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CriteriaView {
    /// Detected or selected criteria, narrowed by LO hints
    #[default]
    Focused,
    /// Every criterion of the linked unit
    Full,
}

/// Set comparison between detected codes and the unit's criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaDiff {
    /// Detected and present in the unit
    pub matched: Vec<CriterionCode>,
    /// In the unit but not detected in the document
    pub missing: Vec<CriterionCode>,
    /// Detected but unknown to the unit
    pub unknown: Vec<CriterionCode>,
}

impl CriteriaDiff {
    /// Every detected code belongs to the unit and every unit code was found
    #[inline]
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.unknown.is_empty()
    }
}

/// Criteria of one learning outcome, in display order
#[derive(Debug, Clone)]
pub struct LearningOutcomeGroup<'a> {
    pub learning_outcome: &'a LearningOutcome,
    pub criteria: Vec<CriterionRef<'a>>,
}

/// Criteria pool for one document's bound unit
#[derive(Debug, Clone)]
pub struct CriteriaMatcher<'a> {
    bound_unit: Option<UnitId>,
    pool: Vec<CriterionRef<'a>>,
}

impl<'a> CriteriaMatcher<'a> {
    /// Build the pool from all known units, keeping only the bound unit
    ///
    /// An unbound document gets an empty pool.
    #[must_use]
    pub fn for_binding<I>(units: I, bound_unit: Option<UnitId>) -> Self
    where
        I: IntoIterator<Item = &'a Unit>,
    {
        let pool = match bound_unit {
            Some(unit_id) => units
                .into_iter()
                .flat_map(|unit| unit.criteria())
                .filter(|c| c.unit_id == unit_id)
                .collect(),
            None => Vec::new(),
        };
        Self { bound_unit, pool }
    }

    /// Unit the pool was built for
    #[inline]
    #[must_use]
    pub fn bound_unit(&self) -> Option<UnitId> {
        self.bound_unit
    }

    /// Number of candidate criteria
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// True when the document is unbound or its unit has no criteria
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Every criterion of the bound unit, sorted
    #[must_use]
    pub fn full_view(&self) -> Vec<CriterionRef<'a>> {
        let mut view = self.pool.clone();
        sort_criteria(&mut view);
        view
    }

    /// Detected or selected criteria, sorted
    ///
    /// When `lo_hints` is non-empty, detected criteria outside the hinted
    /// outcomes are dropped. Selected criteria always stay visible so an
    /// existing mapping cannot silently disappear from review.
    #[must_use]
    pub fn focused_view(
        &self,
        detected: &[CriterionCode],
        selected: &[CriterionCode],
        lo_hints: &BTreeSet<u32>,
    ) -> Vec<CriterionRef<'a>> {
        let detected: BTreeSet<&CriterionCode> = detected.iter().collect();
        let selected: BTreeSet<&CriterionCode> = selected.iter().collect();

        let mut view: Vec<CriterionRef<'a>> = self
            .pool
            .iter()
            .copied()
            .filter(|c| {
                if selected.contains(c.code()) {
                    return true;
                }
                detected.contains(c.code())
                    && (lo_hints.is_empty()
                        || c.learning_outcome
                            .lo_number()
                            .is_some_and(|n| lo_hints.contains(&n)))
            })
            .collect();
        sort_criteria(&mut view);
        view
    }

    /// Listing for the requested view
    #[must_use]
    pub fn view(
        &self,
        kind: CriteriaView,
        detected: &[CriterionCode],
        selected: &[CriterionCode],
        lo_hints: &BTreeSet<u32>,
    ) -> Vec<CriterionRef<'a>> {
        match kind {
            CriteriaView::Focused => self.focused_view(detected, selected, lo_hints),
            CriteriaView::Full => self.full_view(),
        }
    }

    /// Compare detected codes against the pool
    #[must_use]
    pub fn diff(&self, detected: &[CriterionCode]) -> CriteriaDiff {
        let detected: BTreeSet<&CriterionCode> = detected.iter().collect();
        let known: BTreeSet<&CriterionCode> = self.pool.iter().map(CriterionRef::code).collect();

        CriteriaDiff {
            matched: known.intersection(&detected).map(|c| (*c).clone()).collect(),
            missing: known.difference(&detected).map(|c| (*c).clone()).collect(),
            unknown: detected.difference(&known).map(|c| (*c).clone()).collect(),
        }
    }

    /// Resolve codes to pool criteria, dropping codes the unit does not have
    #[must_use]
    pub fn resolve(&self, codes: &[CriterionCode]) -> Vec<CriterionRef<'a>> {
        let wanted: BTreeSet<&CriterionCode> = codes.iter().collect();
        let mut found: Vec<CriterionRef<'a>> = self
            .pool
            .iter()
            .copied()
            .filter(|c| wanted.contains(c.code()))
            .collect();
        sort_criteria(&mut found);
        found
    }
}

/// Band-then-code ordering
#[must_use]
pub fn compare_criteria(a: &CriterionRef<'_>, b: &CriterionRef<'_>) -> Ordering {
    a.criterion
        .band_rank()
        .cmp(&b.criterion.band_rank())
        .then_with(|| a.code().as_str().cmp(b.code().as_str()))
}

/// Sort in place with [`compare_criteria`]
pub fn sort_criteria(criteria: &mut [CriterionRef<'_>]) {
    criteria.sort_by(compare_criteria);
}

/// Group criteria by learning outcome
///
/// Groups are ordered by `loCode`; members by band then code.
#[must_use]
pub fn group_by_learning_outcome<'a>(criteria: &[CriterionRef<'a>]) -> Vec<LearningOutcomeGroup<'a>> {
    let mut groups: Vec<LearningOutcomeGroup<'a>> = Vec::new();
    for c in criteria {
        match groups
            .iter_mut()
            .find(|g| g.learning_outcome.id == c.learning_outcome.id)
        {
            Some(group) => group.criteria.push(*c),
            None => groups.push(LearningOutcomeGroup {
                learning_outcome: c.learning_outcome,
                criteria: vec![*c],
            }),
        }
    }
    for group in &mut groups {
        sort_criteria(&mut group.criteria);
    }
    groups.sort_by(|a, b| a.learning_outcome.lo_code.cmp(&b.learning_outcome.lo_code));
    groups
}
