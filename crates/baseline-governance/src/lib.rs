//! Assignment brief governance
//!
//! Rules that protect a locked brief once it is used for grading:
//!
//! - [`lock`]: at most one locked, non-archived brief per unit and
//!   assignment code, with an explicit confirm-to-overwrite path
//! - [`scope`]: grading scope changes one criterion at a time, with a reason
//! - [`audit`]: bounded exclusion log whose fold is the current reason map
//!
//! # Example
//!
//! ```rust
//! use baseline_governance::{validate_scope_change, ExclusionLedger, ScopeChangeRequest};
//! use chrono::Utc;
//!
//! let request = ScopeChangeRequest::exclude("M2", "Task 3 removed this cohort");
//! let change = validate_scope_change(["P1"], ["P1", "M2"], &request, 6).unwrap();
//! let ledger = ExclusionLedger::new().apply_change(&change, "tutor", Utc::now(), 0.0, 120);
//! assert_eq!(ledger.reasons().len(), 1);
//! ```

#![allow(missing_docs)]

pub mod audit;
pub mod brief;
pub mod error;
pub mod lock;
pub mod scope;

// Re-exports
pub use audit::{replay, ExclusionLedger, ExclusionLogEntry, ExclusionReason, EXCLUSION_LOG_CAPACITY};
pub use brief::{normalize_assignment_code, AssignmentBrief};
pub use error::{LockConflict, ScopeChangeError};
pub use lock::{lock_holders, resolve_lock, LockDecision, OverwriteConfirmation};
pub use scope::{
    validate_scope_change, ScopeChangeRequest, ScopeDiff, ValidatedScopeChange, MIN_REASON_CHARS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
