//! Criterion code normalization
//!
//! Provides [`CriterionCode`], the canonical `P3`/`M12`/`D1` identifier used
//! by every other component for diffing, display and map keys.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

static CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([PMD])\s*(\d{1,2})\s*$").expect("static criterion code pattern")
});

/// Canonical criterion code: grade letter followed by a decimal number
/// without leading zeros.
///
/// Ordering is plain string ordering (`P10` sorts before `P2`), which is the
/// canonical serialization order for diffs and display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CriterionCode(String);

impl CriterionCode {
    /// Normalize free-form input into a canonical code
    ///
    /// Returns `None` for anything that is not a recognisable code; this is
    /// never an error because detected codes are best-effort input.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let caps = CODE_PATTERN.captures(input)?;
        let letter = caps.get(1)?.as_str().to_ascii_uppercase();
        let number: u8 = caps.get(2)?.as_str().parse().ok()?;
        Some(Self(format!("{letter}{number}")))
    }

    /// Canonical string form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Grade letter (`P`, `M` or `D`)
    #[inline]
    #[must_use]
    pub fn letter(&self) -> char {
        self.0.chars().next().unwrap_or('P')
    }

    /// Numeric part of the code
    #[must_use]
    pub fn number(&self) -> u8 {
        self.0[1..].parse().unwrap_or(0)
    }
}

impl Display for CriterionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CriterionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CriterionCode {
    type Err = InvalidCriterionCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidCriterionCode(s.to_string()))
    }
}

// Persisted codes are re-normalized on the way in so stale records written
// with `p03` or `M 2` still key the same map entries.
impl<'de> Deserialize<'de> for CriterionCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom(InvalidCriterionCode(raw)))
    }
}

/// Input that does not match the criterion code pattern
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid criterion code: '{0}'")]
pub struct InvalidCriterionCode(pub String);

/// Normalize a single code, `None` when it does not match
#[inline]
#[must_use]
pub fn normalize_criterion_code(input: &str) -> Option<CriterionCode> {
    CriterionCode::parse(input)
}

/// Normalize, de-duplicate and sort a list of raw codes
///
/// Unrecognisable entries are dropped silently.
#[must_use]
pub fn normalize_criteria_code_list<I, S>(input: I) -> Vec<CriterionCode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    input
        .into_iter()
        .filter_map(|raw| CriterionCode::parse(raw.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
