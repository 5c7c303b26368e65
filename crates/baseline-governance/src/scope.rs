//! Grading-scope change validation
//!
//! A scope change excludes or re-includes exactly one criterion. The caller
//! sends the full next exclusion set plus a declaration of what it believes
//! it changed; the validator diffs the sets and refuses anything that is not
//! a single, matching, justified change.

use crate::error::ScopeChangeError;
use baseline_criteria::{normalize_criteria_code_list, normalize_criterion_code, CriterionCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default minimum reason length, in characters after trimming
pub const MIN_REASON_CHARS: usize = 6;

/// Caller's declaration of the change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeChangeRequest {
    pub criterion_code: String,
    pub excluded: bool,
    pub reason: String,
    #[serde(default)]
    pub confirm_live_change: bool,
}

impl ScopeChangeRequest {
    /// Declare an exclusion
    #[must_use]
    pub fn exclude(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            criterion_code: code.into(),
            excluded: true,
            reason: reason.into(),
            confirm_live_change: false,
        }
    }

    /// Declare a re-inclusion
    #[must_use]
    pub fn include(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            excluded: false,
            ..Self::exclude(code, reason)
        }
    }

    /// Confirm the change applies to a brief already used for grading
    #[must_use]
    pub fn confirmed_live(mut self) -> Self {
        self.confirm_live_change = true;
        self
    }
}

/// Both exclusion sets and their differences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeDiff {
    pub previous: Vec<CriterionCode>,
    pub next: Vec<CriterionCode>,
    pub added: Vec<CriterionCode>,
    pub removed: Vec<CriterionCode>,
}

impl ScopeDiff {
    /// Normalize both sets and diff them
    #[must_use]
    pub fn compute<P, N, S, T>(previous: P, next: N) -> Self
    where
        P: IntoIterator<Item = S>,
        N: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let previous = normalize_criteria_code_list(previous);
        let next = normalize_criteria_code_list(next);
        let prev_set: BTreeSet<&CriterionCode> = previous.iter().collect();
        let next_set: BTreeSet<&CriterionCode> = next.iter().collect();

        let added = next_set.difference(&prev_set).map(|c| (*c).clone()).collect();
        let removed = prev_set.difference(&next_set).map(|c| (*c).clone()).collect();
        Self {
            previous,
            next,
            added,
            removed,
        }
    }

    /// Number of codes whose membership changed
    #[inline]
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

/// A change that passed validation
///
/// Only [`validate_scope_change`] builds these, so holding one proves the
/// diff, declaration and reason were checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedScopeChange {
    criterion_code: CriterionCode,
    excluded: bool,
    reason: String,
    confirm_live_change: bool,
    previous_excluded: Vec<CriterionCode>,
    next_excluded: Vec<CriterionCode>,
}

impl ValidatedScopeChange {
    /// The single criterion that changed
    #[inline]
    #[must_use]
    pub fn criterion_code(&self) -> &CriterionCode {
        &self.criterion_code
    }

    /// True for an exclusion, false for a re-inclusion
    #[inline]
    #[must_use]
    pub fn excluded(&self) -> bool {
        self.excluded
    }

    /// Trimmed justification
    #[inline]
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Caller confirmed a live-brief change
    #[inline]
    #[must_use]
    pub fn confirm_live_change(&self) -> bool {
        self.confirm_live_change
    }

    /// Exclusions before the change
    #[inline]
    #[must_use]
    pub fn previous_excluded(&self) -> &[CriterionCode] {
        &self.previous_excluded
    }

    /// Exclusions after the change
    #[inline]
    #[must_use]
    pub fn next_excluded(&self) -> &[CriterionCode] {
        &self.next_excluded
    }
}

/// Validate a single-criterion scope change
///
/// Checks run in a fixed order: exactly one code changed, the declared code
/// normalizes, the declaration matches the diff, the reason is long enough.
pub fn validate_scope_change<P, N, S, T>(
    previous_excluded: P,
    next_excluded: N,
    change: &ScopeChangeRequest,
    min_reason_chars: usize,
) -> Result<ValidatedScopeChange, ScopeChangeError>
where
    P: IntoIterator<Item = S>,
    N: IntoIterator<Item = T>,
    S: AsRef<str>,
    T: AsRef<str>,
{
    let diff = ScopeDiff::compute(previous_excluded, next_excluded);
    if diff.changed_count() != 1 {
        return Err(ScopeChangeError::OneAtATime { diff });
    }

    let (inferred_code, inferred_excluded) = match (diff.added.first(), diff.removed.first()) {
        (Some(code), _) => (code.clone(), true),
        (None, Some(code)) => (code.clone(), false),
        (None, None) => return Err(ScopeChangeError::OneAtATime { diff }),
    };

    let declared_code = normalize_criterion_code(&change.criterion_code).ok_or_else(|| {
        ScopeChangeError::InvalidCode {
            given: change.criterion_code.clone(),
        }
    })?;

    if declared_code != inferred_code || change.excluded != inferred_excluded {
        return Err(ScopeChangeError::Mismatch {
            declared_code,
            declared_excluded: change.excluded,
            inferred_code,
            inferred_excluded,
        });
    }

    let reason = change.reason.trim();
    let reason_chars = reason.chars().count();
    if reason_chars < min_reason_chars {
        return Err(ScopeChangeError::ReasonTooShort {
            min: min_reason_chars,
            actual: reason_chars,
        });
    }

    Ok(ValidatedScopeChange {
        criterion_code: inferred_code,
        excluded: inferred_excluded,
        reason: reason.to_string(),
        confirm_live_change: change.confirm_live_change,
        previous_excluded: diff.previous,
        next_excluded: diff.next,
    })
}
