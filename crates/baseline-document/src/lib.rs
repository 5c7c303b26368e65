//! Reference document lifecycle
//!
//! Owns the [`ReferenceDocument`] record, its typed extraction [`Draft`], and
//! the guard logic for every status change:
//!
//! ```text
//! UPLOADED ──extract──▶ EXTRACTED ──lock──▶ LOCKED
//!     │                  │    ▲                │
//!     └──fail──▶ FAILED ◀┘    └────unlock──────┘
//! ```
//!
//! `REVIEWED` is an optional stop between `EXTRACTED` and `LOCKED`. Archiving
//! is orthogonal to status.
//!
//! # Example
//!
//! ```rust
//! use baseline_document::{lifecycle, DocumentKind, DocumentUsage, ExtractionOutput,
//!     ReextractRequest, ReferenceDocument};
//! use chrono::Utc;
//!
//! let mut doc = ReferenceDocument::new(DocumentKind::Spec, "Unit 4 spec", "00ff", 1, Utc::now());
//! let extraction = ExtractionOutput::from_value(&serde_json::json!({"unitCode": "4"}))
//!     .into_extraction(doc.kind);
//! lifecycle::extract(&mut doc, extraction, &ReextractRequest::default(), Utc::now()).unwrap();
//! lifecycle::lock(&mut doc, &DocumentUsage::unused(false), None, Utc::now()).unwrap();
//! assert!(doc.locked_at().is_some());
//! ```

#![allow(missing_docs)]

pub mod checksum;
pub mod document;
pub mod draft;
pub mod error;
pub mod lifecycle;
pub mod state_machine;
pub mod usage;

// Re-exports
pub use checksum::sha256_hex;
pub use document::{DocumentKind, DocumentStatus, ReferenceDocument, SourceMeta};
pub use draft::{
    BriefDraft, Draft, DraftCriterion, DraftLearningOutcome, Extraction, ExtractionOutput,
    SpecDraft,
};
pub use error::LifecycleError;
pub use lifecycle::{ConflictClearance, LifecycleAction, ReextractRequest, Transition};
pub use usage::{DocumentUsage, UsageCounts};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
