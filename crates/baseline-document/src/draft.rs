//! Extracted drafts
//!
//! The extraction producer hands back loosely-typed JSON. It is coerced once,
//! here, into a tagged [`Draft`] so the rest of the system pattern-matches on
//! spec/brief shapes instead of probing fields.

use crate::document::DocumentKind;
use baseline_criteria::{
    learning_outcome_hints_in, normalize_criteria_code_list, normalize_criterion_code, Criterion,
    CriterionCode, DocumentId, GradeBand, LearningOutcome, Unit,
};
use baseline_warnings::{Equation, ExtractedTask, TaskConfidence, TaskPart};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Structured extraction result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Draft {
    /// Unit specification
    Spec(SpecDraft),
    /// Assignment brief
    Brief(BriefDraft),
    /// Anything the producer returned that is neither
    Unknown(Value),
}

impl Draft {
    /// Unit code named (or guessed) by the draft
    #[must_use]
    pub fn unit_code(&self) -> Option<&str> {
        match self {
            Self::Spec(spec) => spec.unit_code.as_deref(),
            Self::Brief(brief) => brief.unit_code_guess.as_deref(),
            Self::Unknown(_) => None,
        }
    }

    /// Assignment code of a brief draft
    #[must_use]
    pub fn assignment_code(&self) -> Option<&str> {
        match self {
            Self::Brief(brief) => brief.assignment_code.as_deref(),
            Self::Spec(_) | Self::Unknown(_) => None,
        }
    }

    /// Criterion codes found in the document, normalized and sorted
    #[must_use]
    pub fn detected_codes(&self) -> Vec<CriterionCode> {
        match self {
            Self::Spec(spec) => normalize_criteria_code_list(
                spec.learning_outcomes
                    .iter()
                    .flat_map(|lo| lo.criteria.iter().map(|c| c.ac_code.as_str())),
            ),
            Self::Brief(brief) => brief.detected_criterion_codes.clone(),
            Self::Unknown(_) => Vec::new(),
        }
    }

    /// Learning-outcome numbers mentioned in brief text
    #[must_use]
    pub fn learning_outcome_hints(&self) -> BTreeSet<u32> {
        match self {
            Self::Brief(brief) => brief.learning_outcome_hints(),
            Self::Spec(_) | Self::Unknown(_) => BTreeSet::new(),
        }
    }

    /// Tasks of a brief draft
    #[must_use]
    pub fn tasks(&self) -> &[ExtractedTask] {
        match self {
            Self::Brief(brief) => &brief.tasks,
            Self::Spec(_) | Self::Unknown(_) => &[],
        }
    }
}

/// Criterion as printed in a spec
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftCriterion {
    pub ac_code: String,
    pub grade_band: Option<String>,
    pub description: String,
}

/// Learning outcome as printed in a spec
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftLearningOutcome {
    pub lo_code: String,
    pub description: String,
    pub essential_content: Option<String>,
    pub criteria: Vec<DraftCriterion>,
}

/// Extracted unit specification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecDraft {
    pub unit_code: Option<String>,
    pub unit_title: Option<String>,
    pub spec_issue: Option<String>,
    pub learning_outcomes: Vec<DraftLearningOutcome>,
}

impl SpecDraft {
    /// Materialize the canonical unit described by this spec
    ///
    /// Criteria whose codes do not normalize are dropped; bands come from
    /// the printed label, else the code letter. `None` without a unit code.
    #[must_use]
    pub fn to_unit(&self, spec_document_id: DocumentId) -> Option<Unit> {
        let unit_code = self.unit_code.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        let mut unit = Unit::new(unit_code, self.unit_title.clone().unwrap_or_default());
        unit.spec_document_id = Some(spec_document_id);

        for draft_lo in &self.learning_outcomes {
            let mut lo = LearningOutcome::new(draft_lo.lo_code.trim(), draft_lo.description.clone());
            lo.essential_content = draft_lo.essential_content.clone();
            let mut seen = BTreeSet::new();
            for draft_criterion in &draft_lo.criteria {
                let Some(code) = normalize_criterion_code(&draft_criterion.ac_code) else {
                    continue;
                };
                if !seen.insert(code.clone()) {
                    continue;
                }
                let mut criterion = Criterion::new(code, draft_criterion.description.clone());
                if let Some(band) = draft_criterion.grade_band.as_deref().and_then(GradeBand::from_label) {
                    criterion.grade_band = Some(band);
                }
                lo = lo.with_criterion(criterion);
            }
            unit = unit.with_learning_outcome(lo);
        }
        Some(unit)
    }
}

/// Extracted assignment brief
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BriefDraft {
    pub unit_code_guess: Option<String>,
    pub assignment_code: Option<String>,
    pub assignment_title: Option<String>,
    pub detected_criterion_codes: Vec<CriterionCode>,
    pub tasks: Vec<ExtractedTask>,
    pub equations: Vec<Equation>,
}

impl BriefDraft {
    /// LO numbers mentioned in the title or any task text
    #[must_use]
    pub fn learning_outcome_hints(&self) -> BTreeSet<u32> {
        learning_outcome_hints_in(
            self.assignment_title
                .as_deref()
                .into_iter()
                .chain(self.tasks.iter().flat_map(|task| task.text_fragments())),
        )
    }
}

/// Draft plus document-level warnings, ready for the lifecycle engine
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub draft: Draft,
    pub warnings: Vec<String>,
}

/// Producer payload after defensive coercion
///
/// Missing or mistyped fields become empty values; nothing here fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutput {
    pub kind: Option<DocumentKind>,
    pub detected_criterion_codes: Vec<CriterionCode>,
    pub unit_code_guess: Option<String>,
    pub unit_title: Option<String>,
    pub spec_issue: Option<String>,
    pub assignment_code: Option<String>,
    pub assignment_title: Option<String>,
    pub warnings: Vec<String>,
    pub equations: Vec<Equation>,
    pub tasks: Vec<ExtractedTask>,
    pub learning_outcomes: Vec<DraftLearningOutcome>,
    pub raw: Value,
}

impl ExtractionOutput {
    /// Coerce an arbitrary producer payload
    #[must_use]
    pub fn from_value(raw: &Value) -> Self {
        Self {
            kind: string_at(raw, &["kind", "documentKind"])
                .as_deref()
                .and_then(DocumentKind::from_label),
            detected_criterion_codes: normalize_criteria_code_list(strings_at(
                raw,
                &["detectedCriterionCodes", "criteriaCodes"],
            )),
            unit_code_guess: string_at(raw, &["unitCodeGuess", "unitCode"]),
            unit_title: string_at(raw, &["unitTitle"]),
            spec_issue: string_at(raw, &["specIssue"]),
            assignment_code: string_at(raw, &["assignmentCode"]),
            assignment_title: string_at(raw, &["assignmentTitle", "title"]),
            warnings: strings_at(raw, &["warnings"]),
            equations: items_at(raw, "equations", |item, _| coerce_equation(item)),
            tasks: items_at(raw, "tasks", coerce_task),
            learning_outcomes: items_at(raw, "learningOutcomes", |item, _| {
                coerce_learning_outcome(item)
            }),
            raw: raw.clone(),
        }
    }

    /// Build the draft, falling back to the document's own kind when the
    /// producer did not say
    #[must_use]
    pub fn into_extraction(self, document_kind: DocumentKind) -> Extraction {
        let draft = match self.kind.unwrap_or(document_kind) {
            DocumentKind::Brief => Draft::Brief(BriefDraft {
                unit_code_guess: self.unit_code_guess,
                assignment_code: self.assignment_code,
                assignment_title: self.assignment_title,
                detected_criterion_codes: self.detected_criterion_codes,
                tasks: self.tasks,
                equations: self.equations,
            }),
            DocumentKind::Spec => Draft::Spec(SpecDraft {
                unit_code: self.unit_code_guess,
                unit_title: self.unit_title,
                spec_issue: self.spec_issue,
                learning_outcomes: self.learning_outcomes,
            }),
            DocumentKind::Rubric => Draft::Unknown(self.raw),
        };
        Extraction {
            draft,
            warnings: self.warnings,
        }
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_at(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| raw.get(key).and_then(scalar_string))
}

fn strings_at(raw: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| match raw.get(key) {
            Some(Value::Array(items)) => Some(items.iter().filter_map(scalar_string).collect()),
            Some(single) => scalar_string(single).map(|s| vec![s]),
            None => None,
        })
        .unwrap_or_default()
}

/// Coerce each object in the array at `key`; non-objects are skipped
fn items_at<T>(raw: &Value, key: &str, coerce: impl Fn(&Value, usize) -> Option<T>) -> Vec<T> {
    match raw.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| item.is_object())
            .enumerate()
            .filter_map(|(index, item)| coerce(item, index))
            .collect(),
        _ => Vec::new(),
    }
}

fn flag_at(raw: &Value, key: &str) -> bool {
    match raw.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Task number from a number or numeric string, else the 1-based position
fn task_number(raw: &Value, index: usize) -> u32 {
    let parsed = match raw.get("n") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.unwrap_or_else(|| u32::try_from(index + 1).unwrap_or(u32::MAX))
}

fn confidence_at(raw: &Value) -> TaskConfidence {
    match string_at(raw, &["confidence"]) {
        Some(label) if label.eq_ignore_ascii_case("heuristic") => TaskConfidence::Heuristic,
        _ => TaskConfidence::default(),
    }
}

fn coerce_equation(raw: &Value) -> Option<Equation> {
    Some(Equation {
        id: string_at(raw, &["id"])?,
        latex: string_at(raw, &["latex"]),
        needs_review: flag_at(raw, "needsReview"),
    })
}

fn coerce_part(raw: &Value, index: usize) -> Option<TaskPart> {
    let text = string_at(raw, &["text"]).unwrap_or_default();
    let key = string_at(raw, &["key"]).unwrap_or_else(|| index.to_string());
    Some(TaskPart { key, text })
}

fn coerce_task(raw: &Value, index: usize) -> Option<ExtractedTask> {
    Some(ExtractedTask {
        n: task_number(raw, index),
        title: string_at(raw, &["title"]),
        text: string_at(raw, &["text"]).unwrap_or_default(),
        prompt: string_at(raw, &["prompt"]),
        parts: items_at(raw, "parts", coerce_part),
        equations: items_at(raw, "equations", |item, _| coerce_equation(item)),
        warnings: strings_at(raw, &["warnings"]),
        confidence: confidence_at(raw),
        ai_corrected: flag_at(raw, "aiCorrected"),
    })
}

fn coerce_criterion(raw: &Value) -> Option<DraftCriterion> {
    Some(DraftCriterion {
        ac_code: string_at(raw, &["acCode", "code"])?,
        grade_band: string_at(raw, &["gradeBand"]),
        description: string_at(raw, &["description"]).unwrap_or_default(),
    })
}

fn coerce_learning_outcome(raw: &Value) -> Option<DraftLearningOutcome> {
    Some(DraftLearningOutcome {
        lo_code: string_at(raw, &["loCode"]).unwrap_or_default(),
        description: string_at(raw, &["description"]).unwrap_or_default(),
        essential_content: string_at(raw, &["essentialContent"]),
        criteria: items_at(raw, "criteria", |item, _| coerce_criterion(item)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn brief_payload_is_coerced() {
        let raw = json!({
            "kind": "brief",
            "detectedCriterionCodes": ["p1", "P 2", 7, "nonsense", "p01"],
            "unitCodeGuess": "4017",
            "assignmentCode": "A1",
            "warnings": ["OpenAI math cleanup applied", null],
            "equations": [{"id": "e1", "latex": "x"}, "broken"],
            "tasks": [{"n": 1, "text": "Covers LO2"}]
        });
        let output = ExtractionOutput::from_value(&raw);
        assert_eq!(output.kind, Some(DocumentKind::Brief));
        let codes: Vec<&str> = output.detected_criterion_codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["P1", "P2"]);
        assert_eq!(output.warnings, vec!["OpenAI math cleanup applied".to_string()]);
        assert_eq!(output.equations.len(), 1);

        let extraction = output.into_extraction(DocumentKind::Spec);
        let Draft::Brief(brief) = &extraction.draft else {
            panic!("expected brief draft");
        };
        assert_eq!(brief.unit_code_guess.as_deref(), Some("4017"));
        assert_eq!(extraction.draft.assignment_code(), Some("A1"));
        assert_eq!(extraction.draft.learning_outcome_hints().into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn garbage_payload_degrades_to_empty() {
        let output = ExtractionOutput::from_value(&json!("not an object"));
        assert!(output.kind.is_none());
        assert!(output.detected_criterion_codes.is_empty());
        let extraction = output.into_extraction(DocumentKind::Rubric);
        assert!(matches!(extraction.draft, Draft::Unknown(_)));
        assert!(extraction.draft.detected_codes().is_empty());
    }

    #[test]
    fn single_string_field_becomes_one_item_list() {
        let output = ExtractionOutput::from_value(&json!({"warnings": "one warning"}));
        assert_eq!(output.warnings, vec!["one warning".to_string()]);
    }

    #[test]
    fn spec_draft_materializes_unit() {
        let raw = json!({
            "kind": "SPEC",
            "unitCode": "4017",
            "unitTitle": "Quality Control",
            "learningOutcomes": [
                {"loCode": "LO2", "description": "Apply", "criteria": [
                    {"acCode": "m 02", "gradeBand": "merit", "description": "analyse"},
                    {"acCode": "P3", "description": "explain"}
                ]},
                {"loCode": "LO1", "description": "Understand", "criteria": [
                    {"acCode": "p1", "description": "describe"},
                    {"acCode": "p01", "description": "duplicate"},
                    {"acCode": "Z9", "description": "ignored"}
                ]}
            ]
        });
        let extraction = ExtractionOutput::from_value(&raw).into_extraction(DocumentKind::Spec);
        let Draft::Spec(spec) = &extraction.draft else {
            panic!("expected spec draft");
        };
        let doc_id = DocumentId::new();
        let unit = spec.to_unit(doc_id).unwrap();
        assert_eq!(unit.unit_code, "4017");
        assert_eq!(unit.spec_document_id, Some(doc_id));
        assert_eq!(unit.learning_outcomes[0].lo_code, "LO1");
        assert_eq!(unit.learning_outcomes[0].criteria.len(), 1);
        assert_eq!(unit.learning_outcomes[1].criteria[0].ac_code.as_str(), "M2");
        assert_eq!(unit.learning_outcomes[1].criteria[0].grade_band, Some(GradeBand::Merit));

        let codes: Vec<String> = extraction.draft.detected_codes().iter().map(ToString::to_string).collect();
        assert_eq!(codes, vec!["M2", "P1", "P3"]);
    }

    #[test]
    fn one_bad_task_field_keeps_the_task() {
        let raw = json!({
            "tasks": [
                {"n": 1, "text": "Clean task"},
                {"n": "2", "text": "String number"},
                {"n": 3, "warnings": ["real warning", null, 4]},
                {"n": 4, "confidence": "heuristic"},
                {"text": "No number", "aiCorrected": "yes", "parts": [{"key": "a", "text": 7}, "junk"]},
                "not a task"
            ]
        });
        let tasks = ExtractionOutput::from_value(&raw).tasks;
        let numbers: Vec<u32> = tasks.iter().map(|t| t.n).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(tasks[1].text, "String number");
        assert_eq!(tasks[2].warnings, vec!["real warning".to_string(), "4".to_string()]);
        assert_eq!(tasks[3].confidence, TaskConfidence::Heuristic);
        assert_eq!(tasks[0].confidence, TaskConfidence::Clean);
        assert!(!tasks[4].ai_corrected);
        assert_eq!(tasks[4].parts.len(), 1);
        assert_eq!(tasks[4].parts[0].text, "7");
    }

    #[test]
    fn unknown_confidence_label_falls_back_to_clean() {
        let raw = json!({"tasks": [{"n": 1, "confidence": ["HEURISTIC"]}, {"n": 2, "confidence": "fuzzy"}]});
        let tasks = ExtractionOutput::from_value(&raw).tasks;
        assert!(tasks.iter().all(|t| t.confidence == TaskConfidence::Clean));
    }

    #[test]
    fn equations_coerce_field_by_field() {
        let raw = json!({
            "equations": [
                {"id": "eq1", "latex": "F = ma", "needsReview": "false"},
                {"id": 2, "latex": null, "needsReview": true},
                {"latex": "orphan"}
            ],
            "tasks": [{"n": 1, "equations": [{"id": "inline", "latex": 5}]}]
        });
        let output = ExtractionOutput::from_value(&raw);
        assert_eq!(output.equations.len(), 2);
        assert!(output.equations[0].is_resolved());
        assert_eq!(output.equations[1].id, "2");
        assert!(!output.equations[1].is_resolved());
        assert_eq!(output.tasks[0].equations[0].latex.as_deref(), Some("5"));
    }

    #[test]
    fn spec_criteria_coerce_field_by_field() {
        let raw = json!({
            "kind": "SPEC",
            "unitCode": 4017,
            "learningOutcomes": [
                {"loCode": "LO1", "description": null, "criteria": [
                    {"acCode": "P1", "description": 12},
                    {"acCode": "P2", "gradeBand": false, "description": "ok"},
                    {"description": "no code"}
                ]}
            ]
        });
        let extraction = ExtractionOutput::from_value(&raw).into_extraction(DocumentKind::Spec);
        let Draft::Spec(spec) = &extraction.draft else {
            panic!("expected spec draft");
        };
        let lo = &spec.learning_outcomes[0];
        assert_eq!(lo.description, "");
        assert_eq!(lo.criteria.len(), 2);
        assert_eq!(lo.criteria[0].description, "12");
        assert!(lo.criteria[1].grade_band.is_none());
        let unit = spec.to_unit(DocumentId::new()).unwrap();
        assert_eq!(unit.unit_code, "4017");
    }

    #[test]
    fn spec_without_unit_code_yields_no_unit() {
        assert!(SpecDraft::default().to_unit(DocumentId::new()).is_none());
    }

    #[test]
    fn draft_serializes_with_kind_tag() {
        let draft = Draft::Brief(BriefDraft::default());
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["kind"], "BRIEF");
        let back: Draft = serde_json::from_value(value).unwrap();
        assert_eq!(back, draft);
    }
}
