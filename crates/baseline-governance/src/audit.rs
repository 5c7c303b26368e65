//! Exclusion audit ledger
//!
//! The ledger keeps the current reason per excluded criterion and an
//! append-only change log capped at a configurable length. Both move
//! together through [`ExclusionLedger::apply_change`]; the reason map can
//! always be rebuilt from the log with [`replay`].

use crate::scope::ValidatedScopeChange;
use baseline_criteria::CriterionCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of log entries retained
pub const EXCLUSION_LOG_CAPACITY: usize = 120;

/// Why a criterion is currently excluded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionReason {
    pub reason: String,
    pub at: DateTime<Utc>,
    pub actor: String,
}

/// One exclusion or re-inclusion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionLogEntry {
    pub criterion_code: CriterionCode,
    pub excluded: bool,
    pub reason: String,
    pub at: DateTime<Utc>,
    pub actor: String,
    #[serde(default)]
    pub graded_submission_count: u64,
}

/// Current exclusion reasons plus the bounded change log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionLedger {
    #[serde(rename = "gradingCriteriaExclusionReasons", default)]
    reasons: BTreeMap<CriterionCode, ExclusionReason>,
    #[serde(rename = "gradingCriteriaExclusionLog", default)]
    log: Vec<ExclusionLogEntry>,
}

impl ExclusionLedger {
    /// Empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reasons keyed by currently excluded code
    #[inline]
    #[must_use]
    pub fn reasons(&self) -> &BTreeMap<CriterionCode, ExclusionReason> {
        &self.reasons
    }

    /// Retained log entries, oldest first
    #[inline]
    #[must_use]
    pub fn log(&self) -> &[ExclusionLogEntry] {
        &self.log
    }

    /// Reason for `code`, if excluded
    #[inline]
    #[must_use]
    pub fn reason_for(&self, code: &CriterionCode) -> Option<&ExclusionReason> {
        self.reasons.get(code)
    }

    /// Record a validated change
    ///
    /// Exclusion sets the reason, re-inclusion drops it, and either appends
    /// one log entry. The log keeps only its newest `capacity` entries.
    #[must_use]
    pub fn apply_change(
        &self,
        change: &ValidatedScopeChange,
        actor: &str,
        at: DateTime<Utc>,
        graded_submission_count: f64,
        capacity: usize,
    ) -> Self {
        let entry = ExclusionLogEntry {
            criterion_code: change.criterion_code().clone(),
            excluded: change.excluded(),
            reason: change.reason().to_string(),
            at,
            actor: actor.to_string(),
            graded_submission_count: clamp_count(graded_submission_count),
        };

        let mut next = self.clone();
        fold_entry(&mut next.reasons, &entry);
        next.log.push(entry);
        let overflow = next.log.len().saturating_sub(capacity.max(1));
        if overflow > 0 {
            next.log.drain(..overflow);
        }
        tracing::debug!(
            "Exclusion ledger now holds {} reasons, {} log entries",
            next.reasons.len(),
            next.log.len()
        );
        next
    }
}

/// Rebuild the reason map by folding log entries in order
#[must_use]
pub fn replay<'a, I>(entries: I) -> BTreeMap<CriterionCode, ExclusionReason>
where
    I: IntoIterator<Item = &'a ExclusionLogEntry>,
{
    entries.into_iter().fold(BTreeMap::new(), |mut reasons, entry| {
        fold_entry(&mut reasons, entry);
        reasons
    })
}

fn fold_entry(reasons: &mut BTreeMap<CriterionCode, ExclusionReason>, entry: &ExclusionLogEntry) {
    if entry.excluded {
        reasons.insert(
            entry.criterion_code.clone(),
            ExclusionReason {
                reason: entry.reason.clone(),
                at: entry.at,
                actor: entry.actor.clone(),
            },
        );
    } else {
        reasons.remove(&entry.criterion_code);
    }
}

/// Non-finite or negative counts become zero; fractions round down
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_count(count: f64) -> u64 {
    if count.is_finite() && count > 0.0 {
        count.floor() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{validate_scope_change, ScopeChangeRequest, MIN_REASON_CHARS};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn exclude(prev: &[&str], code: &str) -> ValidatedScopeChange {
        let mut next: Vec<&str> = prev.to_vec();
        next.push(code);
        validate_scope_change(
            prev.iter().copied(),
            next,
            &ScopeChangeRequest::exclude(code, "Evidence unclear in submission set"),
            MIN_REASON_CHARS,
        )
        .unwrap()
    }

    fn include(prev: &[&str], code: &str) -> ValidatedScopeChange {
        let next: Vec<&str> = prev.iter().copied().filter(|c| *c != code).collect();
        validate_scope_change(
            prev.iter().copied(),
            next,
            &ScopeChangeRequest::include(code, "Evidence now available"),
            MIN_REASON_CHARS,
        )
        .unwrap()
    }

    #[test]
    fn exclusion_records_reason_and_entry() {
        let ledger = ExclusionLedger::new().apply_change(&exclude(&[], "P2"), "tutor", t0(), 3.0, 120);
        let code = CriterionCode::parse("P2").unwrap();
        let reason = ledger.reason_for(&code).unwrap();
        assert_eq!(reason.actor, "tutor");
        assert_eq!(reason.reason, "Evidence unclear in submission set");
        assert_eq!(ledger.log().len(), 1);
        assert!(ledger.log()[0].excluded);
        assert_eq!(ledger.log()[0].graded_submission_count, 3);
    }

    #[test]
    fn reinclusion_removes_reason_and_keeps_history() {
        let ledger = ExclusionLedger::new()
            .apply_change(&exclude(&[], "P2"), "tutor", t0(), 0.0, 120)
            .apply_change(&include(&["P2"], "P2"), "lead", t0() + Duration::hours(1), 0.0, 120);
        assert!(ledger.reasons().is_empty());
        assert_eq!(ledger.log().len(), 2);
        assert!(!ledger.log()[1].excluded);
        assert_eq!(ledger.log()[1].actor, "lead");
    }

    #[test]
    fn log_is_capped_to_newest_entries() {
        let mut ledger = ExclusionLedger::new();
        for i in 0..130 {
            let change = if i % 2 == 0 {
                exclude(&[], "M1")
            } else {
                include(&["M1"], "M1")
            };
            ledger = ledger.apply_change(&change, "tutor", t0() + Duration::minutes(i), 0.0, 120);
        }
        assert_eq!(ledger.log().len(), 120);
        assert_eq!(ledger.log()[0].at, t0() + Duration::minutes(10));
        assert_eq!(ledger.log()[119].at, t0() + Duration::minutes(129));
        // 130 alternating changes end on a re-inclusion
        assert!(ledger.reasons().is_empty());
    }

    #[test]
    fn submission_count_is_clamped() {
        assert_eq!(clamp_count(f64::NAN), 0);
        assert_eq!(clamp_count(f64::INFINITY), 0);
        assert_eq!(clamp_count(-4.0), 0);
        assert_eq!(clamp_count(7.9), 7);
        assert_eq!(clamp_count(0.0), 0);
    }

    #[test]
    fn replay_matches_incremental_reasons() {
        let ledger = ExclusionLedger::new()
            .apply_change(&exclude(&[], "P2"), "a", t0(), 0.0, 120)
            .apply_change(&exclude(&["P2"], "D1"), "b", t0(), 0.0, 120)
            .apply_change(&include(&["D1", "P2"], "P2"), "c", t0(), 0.0, 120);
        assert_eq!(&replay(ledger.log()), ledger.reasons());
        assert_eq!(ledger.reasons().len(), 1);
    }

    #[test]
    fn serializes_with_source_meta_keys() {
        let ledger = ExclusionLedger::new().apply_change(&exclude(&[], "P2"), "a", t0(), 1.0, 120);
        let value = serde_json::to_value(&ledger).unwrap();
        assert!(value["gradingCriteriaExclusionReasons"]["P2"].is_object());
        assert_eq!(value["gradingCriteriaExclusionLog"][0]["criterionCode"], "P2");
        assert_eq!(value["gradingCriteriaExclusionLog"][0]["gradedSubmissionCount"], 1);

        let back: ExclusionLedger = serde_json::from_value(value).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn missing_keys_deserialize_empty() {
        let ledger: ExclusionLedger = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(ledger.reasons().is_empty());
        assert!(ledger.log().is_empty());
    }
}
