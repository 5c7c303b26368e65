//! Criteria foundation
//!
//! Canonical criterion codes and the unit/learning-outcome/criterion
//! universe that detected codes are reconciled against.
//!
//! # Overview
//!
//! - **CriterionCode**: normalized `[PMD]n` code, the key of every diff
//! - **Unit**: owns learning outcomes, which own criteria
//! - **CriteriaMatcher**: bound-unit pool with focused/full views and diffs
//!
//! # Example
//!
//! ```rust
//! use baseline_criteria::{normalize_criteria_code_list, normalize_criterion_code};
//!
//! assert_eq!(normalize_criterion_code("p 03").unwrap().as_str(), "P3");
//!
//! let codes = normalize_criteria_code_list(["m3", "M3", "p1"]);
//! let codes: Vec<&str> = codes.iter().map(|c| c.as_str()).collect();
//! assert_eq!(codes, vec!["M3", "P1"]);
//! ```

#![allow(missing_docs)]

pub mod code;
pub mod hints;
pub mod ids;
pub mod matcher;
pub mod unit;

// Re-exports
pub use code::{
    normalize_criteria_code_list, normalize_criterion_code, CriterionCode, InvalidCriterionCode,
};
pub use hints::{learning_outcome_hints, learning_outcome_hints_in};
pub use ids::{BriefId, CriterionId, DocumentId, LearningOutcomeId, UnitId};
pub use matcher::{
    compare_criteria, group_by_learning_outcome, sort_criteria, CriteriaDiff, CriteriaMatcher,
    CriteriaView, LearningOutcomeGroup,
};
pub use unit::{Criterion, CriterionRef, GradeBand, LearningOutcome, Unit, UnitStatus};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for criteria work
    pub use crate::{
        normalize_criteria_code_list, normalize_criterion_code, CriteriaMatcher, CriteriaView,
        Criterion, CriterionCode, GradeBand, LearningOutcome, Unit, UnitId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
