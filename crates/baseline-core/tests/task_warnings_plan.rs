//! Functional tests for effective task warnings on extracted briefs.
//!
//! Raw extraction warnings about equations go stale once the referenced
//! equations resolve or a manual LaTeX override is entered.

use baseline_test_utils::TestHarness;
use baseline_warnings::{EffectiveConfidence, Resolution};
use std::collections::HashMap;

/// Tenet: resolved equation references clear low-confidence warnings.
#[test]
fn resolved_references_clear_warnings() {
    let h = TestHarness::new();
    let doc = h.extracted_brief("A1 Forces", "A1", &["P3"]);

    let reviews = h.service.review_tasks(doc.id, &HashMap::new()).unwrap();
    assert_eq!(reviews.len(), 2);

    let first = &reviews[0];
    assert_eq!(first.n, 1);
    assert!(first.warnings.is_empty());
    assert_eq!(first.confidence, EffectiveConfidence::Clean);
    assert_eq!(first.resolution, Some(Resolution::ReferencedEquations));
    assert!(!first.ai_corrected);
}

/// Tenet: an unresolved task keeps its warning; the cleanup note never shows.
#[test]
fn unresolved_task_keeps_warning() {
    let h = TestHarness::new();
    let doc = h.extracted_brief("A1 Forces", "A1", &["P3"]);

    let reviews = h.service.review_tasks(doc.id, &HashMap::new()).unwrap();
    let second = &reviews[1];
    assert_eq!(second.warnings, vec!["equation quality: low-confidence (1)".to_string()]);
    assert_eq!(second.confidence, EffectiveConfidence::Heuristic);
    assert!(second.ai_corrected);
    assert!(second.resolution.is_none());
}

/// Tenet: a manual override resolves the task it names and no other.
#[test]
fn override_resolves_named_task() {
    let h = TestHarness::new();
    let doc = h.extracted_brief("A1 Forces", "A1", &["P3"]);
    let overrides = HashMap::from([("2.a".to_string(), r"\tau = F r".to_string())]);

    let reviews = h.service.review_tasks(doc.id, &overrides).unwrap();
    let second = &reviews[1];
    assert!(second.warnings.is_empty());
    assert_eq!(second.confidence, EffectiveConfidence::Overridden);
    assert_eq!(second.resolution, Some(Resolution::ManualOverride));
    assert!(second.ai_corrected);

    let blank = HashMap::from([("2".to_string(), "   ".to_string())]);
    let reviews = h.service.review_tasks(doc.id, &blank).unwrap();
    assert_eq!(reviews[1].confidence, EffectiveConfidence::Heuristic);
}
