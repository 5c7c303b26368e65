//! Extracted task payloads
//!
//! Shapes produced by the extraction step for brief tasks. Every field
//! defaults so malformed producer output degrades to empty values instead of
//! failing deserialization.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

static EQUATION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[EQ:([^\]\s]+)\]\]").expect("static equation token pattern"));

/// Extracted equation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Equation {
    pub id: String,
    pub latex: Option<String>,
    pub needs_review: bool,
}

impl Equation {
    /// Create an equation with LaTeX content
    #[must_use]
    pub fn new(id: impl Into<String>, latex: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            latex: Some(latex.into()),
            needs_review: false,
        }
    }

    /// Flag the equation for manual review
    #[must_use]
    pub fn needing_review(mut self) -> Self {
        self.needs_review = true;
        self
    }

    /// Usable as-is: has LaTeX and nobody asked for a review
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.needs_review && self.latex.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

/// Extraction confidence for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskConfidence {
    /// Parsed without heuristics
    #[default]
    Clean,
    /// Parsed with heuristic recovery
    Heuristic,
}

/// Sub-part of a task (`1.a`, `1.b`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPart {
    pub key: String,
    pub text: String,
}

/// Task extracted from a brief
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedTask {
    pub n: u32,
    pub title: Option<String>,
    pub text: String,
    pub prompt: Option<String>,
    pub parts: Vec<TaskPart>,
    pub equations: Vec<Equation>,
    pub warnings: Vec<String>,
    pub confidence: TaskConfidence,
    pub ai_corrected: bool,
}

impl ExtractedTask {
    /// Create a task with body text
    #[must_use]
    pub fn new(n: u32, text: impl Into<String>) -> Self {
        Self {
            n,
            text: text.into(),
            ..Self::default()
        }
    }

    /// Append a raw warning
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Attach an inline equation
    #[must_use]
    pub fn with_equation(mut self, equation: Equation) -> Self {
        self.equations.push(equation);
        self
    }

    /// Add a sub-part
    #[must_use]
    pub fn with_part(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.parts.push(TaskPart {
            key: key.into(),
            text: text.into(),
        });
        self
    }

    /// Text fragments that may carry equation tokens
    pub fn text_fragments(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.text.as_str())
            .chain(self.prompt.as_deref())
            .chain(self.parts.iter().map(|p| p.text.as_str()))
    }

    /// Ids of every `[[EQ:id]]` token in the task text
    #[must_use]
    pub fn equation_token_ids(&self) -> BTreeSet<String> {
        self.text_fragments()
            .flat_map(|text| EQUATION_TOKEN.captures_iter(text))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_tokens_from_text_prompt_and_parts() {
        let mut task = ExtractedTask::new(1, "Solve [[EQ:e1]] and [[EQ:e2]]")
            .with_part("a", "then [[EQ:e3]]")
            .with_part("b", "no equation");
        task.prompt = Some("recall [[EQ:e1]]".to_string());

        let ids: Vec<String> = task.equation_token_ids().into_iter().collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn equation_resolution_rule() {
        assert!(Equation::new("e", "x^2").is_resolved());
        assert!(!Equation::new("e", "   ").is_resolved());
        assert!(!Equation::new("e", "x^2").needing_review().is_resolved());
        assert!(!Equation::default().is_resolved());
    }

    #[test]
    fn malformed_payload_degrades_to_defaults() {
        let task: ExtractedTask = serde_json::from_str(r#"{"n": 3, "unexpected": true}"#).unwrap();
        assert_eq!(task.n, 3);
        assert!(task.warnings.is_empty());
        assert_eq!(task.confidence, TaskConfidence::Clean);
    }
}
