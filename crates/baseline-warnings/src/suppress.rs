//! Effective warning computation
//!
//! Raw extraction warnings go stale once equations are fixed or a manual
//! LaTeX override is entered. The functions here decide which warnings are
//! still true for display.

use crate::task::{Equation, ExtractedTask, TaskConfidence};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

static CLEANUP_APPLIED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)openai math cleanup applied").expect("static cleanup pattern"));
static LOW_CONFIDENCE_EQUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)equation quality:\s*low-confidence").expect("static equation pattern")
});

/// Confidence shown next to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectiveConfidence {
    /// No caveats
    Clean,
    /// Heuristic parse with visible warnings
    Heuristic,
    /// Manual override in effect
    Overridden,
}

/// Why a task counts as resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// Inline equations are all usable
    InlineEquations,
    /// Every referenced equation token resolves in the store
    ReferencedEquations,
    /// A manual LaTeX override exists
    ManualOverride,
}

/// True when `overrides` holds non-empty LaTeX for task `n`
///
/// Keys are `"{n}.{subpart}"`; a bare `"{n}"` key also counts.
#[must_use]
pub fn has_latex_override(n: u32, overrides: &HashMap<String, String>) -> bool {
    let bare = n.to_string();
    let prefix = format!("{n}.");
    overrides
        .iter()
        .any(|(key, latex)| (key == &bare || key.starts_with(&prefix)) && !latex.trim().is_empty())
}

/// Resolution signal for a task, if any
#[must_use]
pub fn task_resolution(
    task: &ExtractedTask,
    equations_by_id: &HashMap<String, Equation>,
    overrides: &HashMap<String, String>,
) -> Option<Resolution> {
    if !task.equations.is_empty() && task.equations.iter().all(Equation::is_resolved) {
        return Some(Resolution::InlineEquations);
    }

    let token_ids = task.equation_token_ids();
    if !token_ids.is_empty()
        && token_ids
            .iter()
            .all(|id| equations_by_id.get(id).is_some_and(Equation::is_resolved))
    {
        return Some(Resolution::ReferencedEquations);
    }

    has_latex_override(task.n, overrides).then_some(Resolution::ManualOverride)
}

/// Warnings that remain true for display
///
/// The cleanup-applied note is always dropped; low-confidence equation
/// warnings are dropped once the task is resolved.
#[must_use]
pub fn effective_warnings(
    task: &ExtractedTask,
    equations_by_id: &HashMap<String, Equation>,
    overrides: &HashMap<String, String>,
) -> Vec<String> {
    let resolved = task_resolution(task, equations_by_id, overrides).is_some();

    task.warnings
        .iter()
        .filter(|w| !CLEANUP_APPLIED.is_match(w))
        .filter(|w| !(resolved && LOW_CONFIDENCE_EQUATION.is_match(w)))
        .cloned()
        .collect()
}

/// Whether to show the "AI corrected" indicator
#[must_use]
pub fn is_task_ai_corrected(task: &ExtractedTask) -> bool {
    task.ai_corrected || task.warnings.iter().any(|w| CLEANUP_APPLIED.is_match(w))
}

/// Confidence to display given the effective warnings
///
/// A heuristic badge with nothing to explain it is upgraded to clean.
#[must_use]
pub fn effective_confidence(
    task: &ExtractedTask,
    effective_warnings: &[String],
    override_applied: bool,
) -> EffectiveConfidence {
    let base = if override_applied {
        EffectiveConfidence::Overridden
    } else if task.confidence == TaskConfidence::Heuristic {
        EffectiveConfidence::Heuristic
    } else {
        EffectiveConfidence::Clean
    };

    if base == EffectiveConfidence::Heuristic && effective_warnings.is_empty() {
        EffectiveConfidence::Clean
    } else {
        base
    }
}

/// Display summary for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReview {
    pub n: u32,
    pub warnings: Vec<String>,
    pub confidence: EffectiveConfidence,
    pub ai_corrected: bool,
    pub resolution: Option<Resolution>,
}

/// Compute warnings, confidence and indicator for a task in one pass
#[must_use]
pub fn review_task(
    task: &ExtractedTask,
    equations_by_id: &HashMap<String, Equation>,
    overrides: &HashMap<String, String>,
) -> TaskReview {
    let resolution = task_resolution(task, equations_by_id, overrides);
    let warnings = effective_warnings(task, equations_by_id, overrides);
    let override_applied = has_latex_override(task.n, overrides);
    TaskReview {
        n: task.n,
        confidence: effective_confidence(task, &warnings, override_applied),
        ai_corrected: is_task_ai_corrected(task),
        warnings,
        resolution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LOW_CONFIDENCE: &str = "Equation quality: low-confidence parse on page 3";
    const CLEANUP: &str = "OpenAI math cleanup applied";

    fn raw_task() -> ExtractedTask {
        ExtractedTask::new(2, "Calculate the impedance [[EQ:eq-7]]")
            .with_warning(LOW_CONFIDENCE)
            .with_warning(CLEANUP)
    }

    #[test]
    fn override_resolves_and_suppresses_everything() {
        let overrides = HashMap::from([("2.a".to_string(), "Z = R + jX".to_string())]);
        let warnings = effective_warnings(&raw_task(), &HashMap::new(), &overrides);
        assert!(warnings.is_empty());
    }

    #[test]
    fn unresolved_keeps_low_confidence_warning() {
        let warnings = effective_warnings(&raw_task(), &HashMap::new(), &HashMap::new());
        assert_eq!(warnings, vec![LOW_CONFIDENCE.to_string()]);
    }

    #[test]
    fn blank_override_does_not_resolve() {
        let overrides = HashMap::from([("2.a".to_string(), "   ".to_string())]);
        assert!(task_resolution(&raw_task(), &HashMap::new(), &overrides).is_none());
    }

    #[test]
    fn override_for_other_task_does_not_count() {
        let overrides = HashMap::from([("12.a".to_string(), "x".to_string())]);
        assert!(!has_latex_override(2, &overrides));
        assert!(has_latex_override(12, &overrides));
    }

    #[test]
    fn referenced_equations_resolve_from_store() {
        let store = HashMap::from([("eq-7".to_string(), Equation::new("eq-7", "Z = V / I"))]);
        assert_eq!(
            task_resolution(&raw_task(), &store, &HashMap::new()),
            Some(Resolution::ReferencedEquations)
        );

        let pending = HashMap::from([(
            "eq-7".to_string(),
            Equation::new("eq-7", "Z = V / I").needing_review(),
        )]);
        assert!(task_resolution(&raw_task(), &pending, &HashMap::new()).is_none());
    }

    #[test]
    fn inline_equations_must_all_be_resolved() {
        let task = raw_task()
            .with_equation(Equation::new("a", "x"))
            .with_equation(Equation::new("b", "y"));
        assert_eq!(
            task_resolution(&task, &HashMap::new(), &HashMap::new()),
            Some(Resolution::InlineEquations)
        );

        let task = task.with_equation(Equation::new("c", ""));
        assert!(task_resolution(&task, &HashMap::new(), &HashMap::new()).is_none());
    }

    #[test]
    fn task_without_equations_or_tokens_is_unresolved() {
        let task = ExtractedTask::new(5, "Describe the OSI model").with_warning(LOW_CONFIDENCE);
        assert!(task_resolution(&task, &HashMap::new(), &HashMap::new()).is_none());
    }

    #[test]
    fn ai_corrected_indicator() {
        assert!(is_task_ai_corrected(&raw_task()));
        assert!(!is_task_ai_corrected(&ExtractedTask::new(1, "x")));
        let mut flagged = ExtractedTask::new(1, "x");
        flagged.ai_corrected = true;
        assert!(is_task_ai_corrected(&flagged));
    }

    #[test]
    fn heuristic_without_warnings_upgrades_to_clean() {
        let mut task = raw_task();
        task.confidence = TaskConfidence::Heuristic;
        assert_eq!(effective_confidence(&task, &[], false), EffectiveConfidence::Clean);
        assert_eq!(
            effective_confidence(&task, &["still here".to_string()], false),
            EffectiveConfidence::Heuristic
        );
        assert_eq!(effective_confidence(&task, &[], true), EffectiveConfidence::Overridden);
    }

    #[test]
    fn review_combines_signals() {
        let mut task = raw_task();
        task.confidence = TaskConfidence::Heuristic;
        let overrides = HashMap::from([("2".to_string(), "Z".to_string())]);
        let review = review_task(&task, &HashMap::new(), &overrides);
        assert!(review.warnings.is_empty());
        assert_eq!(review.confidence, EffectiveConfidence::Overridden);
        assert!(review.ai_corrected);
        assert_eq!(review.resolution, Some(Resolution::ManualOverride));
    }
}
