//! Testing utilities for the baseline workspace
//!
//! Shared fixtures, extraction payloads and a ready-wired service harness.

#![allow(missing_docs)]

use baseline_core::{
    GovernanceConfig, GovernanceService, InMemoryStore, LockRequest, RecordingSink, StaticUsage,
    UploadRequest,
};
use baseline_criteria::{Criterion, CriterionCode, LearningOutcome, Unit};
use baseline_document::{DocumentKind, ReextractRequest, ReferenceDocument, UsageCounts};
use serde_json::{json, Value};
use std::sync::Arc;

pub const UNIT_CODE: &str = "4017";
pub const UNIT_TITLE: &str = "Engineering Principles";

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn code(s: &str) -> CriterionCode {
    CriterionCode::parse(s).unwrap()
}

/// (loCode, description, criteria) rows of the sample unit
fn sample_outcomes() -> Vec<(&'static str, &'static str, Vec<(&'static str, &'static str)>)> {
    vec![
        (
            "LO1",
            "Examine scientific data using both quantitative and computational methods",
            vec![
                ("P1", "Interpret and present qualitative and quantitative data"),
                ("P2", "Use appropriate statistical tests to analyse data"),
                ("M1", "Evaluate data to explain the reliability of findings"),
                ("D1", "Critically evaluate the methods of analysis"),
            ],
        ),
        (
            "LO2",
            "Determine parameters within mechanical engineering systems",
            vec![
                ("P3", "Determine parameters of loaded beams"),
                ("P4", "Determine the forces acting on static bodies"),
                ("M2", "Determine torque in rotating systems"),
            ],
        ),
        (
            "LO3",
            "Explore the characteristics of electrical systems",
            vec![
                ("P5", "Solve problems using series and parallel circuits"),
                ("P6", "Apply Kirchhoff's laws to direct current networks"),
                ("M3", "Determine circuit response with complex loads"),
                ("D2", "Evaluate electrical system performance"),
            ],
        ),
    ]
}

/// Canonical unit with three learning outcomes
pub fn sample_unit() -> Unit {
    sample_outcomes()
        .into_iter()
        .fold(Unit::new(UNIT_CODE, UNIT_TITLE), |unit, (lo_code, description, criteria)| {
            let lo = criteria.into_iter().fold(
                LearningOutcome::new(lo_code, description),
                |lo, (ac, text)| lo.with_criterion(Criterion::new(code(ac), text)),
            );
            unit.with_learning_outcome(lo)
        })
}

/// Producer payload for the sample unit's spec
pub fn spec_payload() -> Value {
    let outcomes: Vec<Value> = sample_outcomes()
        .into_iter()
        .map(|(lo_code, description, criteria)| {
            json!({
                "loCode": lo_code,
                "description": description,
                "criteria": criteria
                    .into_iter()
                    .map(|(ac, text)| json!({ "acCode": ac, "description": text }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "kind": "SPEC",
        "unitCode": UNIT_CODE,
        "unitTitle": UNIT_TITLE,
        "specIssue": "Issue 3",
        "learningOutcomes": outcomes,
    })
}

/// Producer payload for a brief detecting `codes`
pub fn brief_payload(assignment_code: &str, codes: &[&str]) -> Value {
    json!({
        "kind": "BRIEF",
        "unitCodeGuess": UNIT_CODE,
        "assignmentCode": assignment_code,
        "assignmentTitle": "Forces and statics (LO2)",
        "detectedCriterionCodes": codes,
        "warnings": [],
        "equations": [
            { "id": "eq1", "latex": "F = ma", "needsReview": false },
            { "id": "eq2", "latex": null, "needsReview": true }
        ],
        "tasks": [
            {
                "n": 1,
                "text": "Calculate the reaction forces [[EQ:eq1]]",
                "confidence": "HEURISTIC",
                "warnings": ["equation quality: low-confidence (1)"]
            },
            {
                "n": 2,
                "text": "Determine the torque [[EQ:eq2]]",
                "confidence": "HEURISTIC",
                "warnings": ["equation quality: low-confidence (1)", "OpenAI math cleanup applied"]
            }
        ]
    })
}

/// Service wired to in-memory collaborators the test can reach into
pub struct TestHarness {
    pub service: GovernanceService,
    pub store: Arc<InMemoryStore>,
    pub usage: Arc<StaticUsage>,
    pub events: Arc<RecordingSink>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(GovernanceConfig::new())
    }

    pub fn with_config(config: GovernanceConfig) -> Self {
        init_tracing();
        let store = Arc::new(InMemoryStore::new());
        let usage = Arc::new(StaticUsage::new());
        let events = Arc::new(RecordingSink::new());
        let service = GovernanceService::new(config, store.clone(), usage.clone(), events.clone())
            .expect("test config is valid");
        Self {
            service,
            store,
            usage,
            events,
        }
    }

    /// Upload, extract, import and lock the sample spec
    pub fn locked_spec_unit(&self) -> (ReferenceDocument, Unit) {
        let spec = self
            .service
            .upload(UploadRequest::new(DocumentKind::Spec, "Unit 4017 spec", "spec"), "admin")
            .unwrap();
        self.service
            .record_extraction(spec.id, &spec_payload(), &ReextractRequest::default(), "admin")
            .unwrap();
        let unit = self.service.import_unit(spec.id, "admin").unwrap();
        let spec = self
            .service
            .lock_document(spec.id, &LockRequest::default(), "admin")
            .unwrap()
            .document;
        (spec, unit)
    }

    /// Upload and extract a brief detecting `codes`
    pub fn extracted_brief(&self, title: &str, assignment_code: &str, codes: &[&str]) -> ReferenceDocument {
        let brief = self
            .service
            .upload(UploadRequest::new(DocumentKind::Brief, title, title.as_bytes()), "tutor")
            .unwrap();
        self.service
            .record_extraction(
                brief.id,
                &brief_payload(assignment_code, codes),
                &ReextractRequest::default(),
                "tutor",
            )
            .unwrap()
    }

    pub fn set_submissions(&self, document: &ReferenceDocument, submissions: u64) {
        self.usage.set(document.id, UsageCounts::new(submissions, 0));
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
