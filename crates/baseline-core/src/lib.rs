//! Criteria baseline governance service
//!
//! Ties the pure rules of the lower crates to storage, usage counts and an
//! audit trail:
//!
//! - **GovernanceService**: every document, brief and scope operation
//! - **GovernanceStore**: conditional batch writes with lock uniqueness
//! - **UsageOracle**: submission and brief-link counts from outside
//! - **EventSink**: one audit event per accepted change
//!
//! # Example
//!
//! ```rust
//! use baseline_core::prelude::*;
//! use std::sync::Arc;
//!
//! let service = GovernanceService::new(
//!     GovernanceConfig::new(),
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(StaticUsage::new()),
//!     Arc::new(RecordingSink::new()),
//! )
//! .unwrap();
//! let doc = service
//!     .upload(UploadRequest::new(DocumentKind::Spec, "Unit 4017 spec", "pdf bytes"), "tutor")
//!     .unwrap();
//! assert_eq!(doc.version, 1);
//! assert!(service.archive(doc.id, "tutor").unwrap());
//! assert!(!service.archive(doc.id, "tutor").unwrap());
//! ```

#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod oracle;
pub mod service;
pub mod store;

// Re-exports
pub use config::GovernanceConfig;
pub use error::{ConfigError, Failure, GovernanceError, StoreError};
pub use event::{
    ChainedEvent, EventId, EventKind, EventSink, GovernanceEvent, RecordingSink, SinkError,
    TracingSink,
};
pub use oracle::{StaticUsage, UsageOracle};
pub use service::{
    CriteriaListing, CriterionSummary, GovernanceService, ListQuery, LockOutcome, LockRequest,
    UploadRequest,
};
pub use store::{Committed, GovernanceStore, InMemoryStore, WriteBatch};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for governance callers
    pub use crate::{
        GovernanceConfig, GovernanceError, GovernanceService, InMemoryStore, ListQuery,
        LockRequest, RecordingSink, StaticUsage, UploadRequest,
    };
    pub use baseline_criteria::{CriteriaView, CriterionCode, Unit, UnitId};
    pub use baseline_document::{DocumentKind, DocumentStatus, ReextractRequest, UsageCounts};
    pub use baseline_governance::{AssignmentBrief, OverwriteConfirmation, ScopeChangeRequest};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
