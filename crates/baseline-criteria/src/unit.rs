//! Canonical criteria universe
//!
//! A [`Unit`] owns its learning outcomes, which own their criteria. These are
//! the records detected codes are reconciled against.

use crate::code::CriterionCode;
use crate::ids::{CriterionId, DocumentId, LearningOutcomeId, UnitId};
use serde::{Deserialize, Serialize};

/// Grade band of a criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradeBand {
    /// Pass (`P` codes)
    Pass,
    /// Merit (`M` codes)
    Merit,
    /// Distinction (`D` codes)
    Distinction,
}

impl GradeBand {
    /// Sort rank used by every criteria listing
    #[inline]
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pass => 1,
            Self::Merit => 2,
            Self::Distinction => 3,
        }
    }

    /// Band implied by a code letter
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'P' => Some(Self::Pass),
            'M' => Some(Self::Merit),
            'D' => Some(Self::Distinction),
            _ => None,
        }
    }

    /// Band from a loose label (`"pass"`, `"MERIT"`, ...)
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "PASS" => Some(Self::Pass),
            "MERIT" => Some(Self::Merit),
            "DISTINCTION" => Some(Self::Distinction),
            _ => None,
        }
    }
}

/// Unit lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    /// Editable
    #[default]
    Draft,
    /// Frozen as a grading baseline
    Locked,
}

/// Assessment criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: CriterionId,
    pub ac_code: CriterionCode,
    /// Missing on some imported records; the code letter stands in for it
    pub grade_band: Option<GradeBand>,
    pub description: String,
}

impl Criterion {
    /// Create a criterion with a band inferred from its code
    #[must_use]
    pub fn new(ac_code: CriterionCode, description: impl Into<String>) -> Self {
        let grade_band = GradeBand::from_letter(ac_code.letter());
        Self {
            id: CriterionId::new(),
            ac_code,
            grade_band,
            description: description.into(),
        }
    }

    /// Band rank: explicit band first, then the code letter, else 9
    #[must_use]
    pub fn band_rank(&self) -> u8 {
        self.grade_band
            .or_else(|| GradeBand::from_letter(self.ac_code.letter()))
            .map_or(9, GradeBand::rank)
    }
}

/// Learning outcome owned by a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningOutcome {
    pub id: LearningOutcomeId,
    pub lo_code: String,
    pub description: String,
    pub essential_content: Option<String>,
    pub criteria: Vec<Criterion>,
}

impl LearningOutcome {
    /// Create an empty learning outcome
    #[must_use]
    pub fn new(lo_code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: LearningOutcomeId::new(),
            lo_code: lo_code.into(),
            description: description.into(),
            essential_content: None,
            criteria: Vec::new(),
        }
    }

    /// Add a criterion, keeping `acCode` order
    #[must_use]
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self.criteria.sort_by(|a, b| a.ac_code.cmp(&b.ac_code));
        self
    }

    /// Numeric part of the LO code (`LO2` → 2)
    #[must_use]
    pub fn lo_number(&self) -> Option<u32> {
        let digits: String = self
            .lo_code
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }
}

/// Subject area holding the canonical criteria
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub unit_code: String,
    pub unit_title: String,
    pub status: UnitStatus,
    pub spec_document_id: Option<DocumentId>,
    pub learning_outcomes: Vec<LearningOutcome>,
}

impl Unit {
    /// Create an empty draft unit
    #[must_use]
    pub fn new(unit_code: impl Into<String>, unit_title: impl Into<String>) -> Self {
        Self {
            id: UnitId::new(),
            unit_code: unit_code.into(),
            unit_title: unit_title.into(),
            status: UnitStatus::Draft,
            spec_document_id: None,
            learning_outcomes: Vec::new(),
        }
    }

    /// Add a learning outcome, keeping `loCode` order
    #[must_use]
    pub fn with_learning_outcome(mut self, lo: LearningOutcome) -> Self {
        self.learning_outcomes.push(lo);
        self.learning_outcomes.sort_by(|a, b| a.lo_code.cmp(&b.lo_code));
        self
    }

    /// Every criterion of the unit, paired with its owning outcome
    pub fn criteria(&self) -> impl Iterator<Item = CriterionRef<'_>> {
        let unit_id = self.id;
        self.learning_outcomes.iter().flat_map(move |lo| {
            lo.criteria.iter().map(move |criterion| CriterionRef {
                unit_id,
                learning_outcome: lo,
                criterion,
            })
        })
    }

    /// Look up a criterion by canonical code
    #[must_use]
    pub fn criterion(&self, code: &CriterionCode) -> Option<CriterionRef<'_>> {
        self.criteria().find(|c| &c.criterion.ac_code == code)
    }
}

/// Borrowed criterion with its learning outcome and unit
#[derive(Debug, Clone, Copy)]
pub struct CriterionRef<'a> {
    pub unit_id: UnitId,
    pub learning_outcome: &'a LearningOutcome,
    pub criterion: &'a Criterion,
}

impl CriterionRef<'_> {
    /// Canonical code of the criterion
    #[inline]
    #[must_use]
    pub fn code(&self) -> &CriterionCode {
        &self.criterion.ac_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CriterionCode {
        CriterionCode::parse(s).unwrap()
    }

    #[test]
    fn band_rank_prefers_explicit_band() {
        let mut c = Criterion::new(code("P1"), "describe");
        assert_eq!(c.band_rank(), 1);
        c.grade_band = Some(GradeBand::Distinction);
        assert_eq!(c.band_rank(), 3);
        c.grade_band = None;
        assert_eq!(c.band_rank(), 1);
    }

    #[test]
    fn band_from_label_is_case_insensitive() {
        assert_eq!(GradeBand::from_label(" merit "), Some(GradeBand::Merit));
        assert_eq!(GradeBand::from_label("excellent"), None);
    }

    #[test]
    fn lo_number_parses_code_digits() {
        assert_eq!(LearningOutcome::new("LO2", "x").lo_number(), Some(2));
        assert_eq!(LearningOutcome::new("LO 12", "x").lo_number(), Some(12));
        assert_eq!(LearningOutcome::new("intro", "x").lo_number(), None);
    }

    #[test]
    fn unit_keeps_outcomes_and_criteria_ordered() {
        let unit = Unit::new("U4", "Networking")
            .with_learning_outcome(
                LearningOutcome::new("LO2", "b")
                    .with_criterion(Criterion::new(code("P3"), "c"))
                    .with_criterion(Criterion::new(code("M2"), "d")),
            )
            .with_learning_outcome(
                LearningOutcome::new("LO1", "a").with_criterion(Criterion::new(code("P1"), "e")),
            );

        let los: Vec<&str> = unit.learning_outcomes.iter().map(|l| l.lo_code.as_str()).collect();
        assert_eq!(los, vec!["LO1", "LO2"]);
        let lo2: Vec<&str> = unit.learning_outcomes[1]
            .criteria
            .iter()
            .map(|c| c.ac_code.as_str())
            .collect();
        assert_eq!(lo2, vec!["M2", "P3"]);
        assert_eq!(unit.criteria().count(), 3);
        assert!(unit.criterion(&code("m2")).is_some());
    }
}
