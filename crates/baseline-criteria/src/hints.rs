//! Learning-outcome hints in free text
//!
//! Briefs usually say which outcomes a task covers ("LO2", "Learning
//! Outcome 3"). Those numbers narrow the focused criteria view.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static LO_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLO\s*(\d+)").expect("static LO pattern"));
static LO_LONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)learning\s+outcome\s*(\d+)").expect("static learning outcome pattern")
});

/// Learning-outcome numbers mentioned in `text`
///
/// Empty when the text carries no hints, in which case callers skip LO
/// narrowing entirely.
#[must_use]
pub fn learning_outcome_hints(text: &str) -> BTreeSet<u32> {
    LO_SHORT
        .captures_iter(text)
        .chain(LO_LONG.captures_iter(text))
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

/// Hints gathered from several text fragments
#[must_use]
pub fn learning_outcome_hints_in<I, S>(fragments: I) -> BTreeSet<u32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fragments
        .into_iter()
        .flat_map(|text| learning_outcome_hints(text.as_ref()))
        .collect()
}
