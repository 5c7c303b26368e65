//! Extraction warning suppression
//!
//! Decides which raw extraction warnings on a brief task are still true once
//! equations have been resolved or a manual LaTeX override exists, and which
//! confidence badge the task should carry.
//!
//! # Example
//!
//! ```rust
//! use baseline_warnings::{effective_warnings, ExtractedTask};
//! use std::collections::HashMap;
//!
//! let task = ExtractedTask::new(1, "Simplify the expression")
//!     .with_warning("Equation quality: low-confidence parse on page 3")
//!     .with_warning("OpenAI math cleanup applied");
//!
//! let overrides = HashMap::from([("1.a".to_string(), "x^2 + 1".to_string())]);
//! assert!(effective_warnings(&task, &HashMap::new(), &overrides).is_empty());
//! ```

#![allow(missing_docs)]

pub mod suppress;
pub mod task;

pub use suppress::{
    effective_confidence, effective_warnings, has_latex_override, is_task_ai_corrected,
    review_task, task_resolution, EffectiveConfidence, Resolution, TaskReview,
};
pub use task::{Equation, ExtractedTask, TaskConfidence, TaskPart};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
