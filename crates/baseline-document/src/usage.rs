//! Derived usage view
//!
//! Usage counts come from an external oracle; this view derives the guard
//! flags from them and is never stored.

use crate::document::ReferenceDocument;
use serde::{Deserialize, Serialize};

/// Raw counts supplied by the usage oracle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounts {
    pub submission_count: u64,
    pub linked_brief_count: u64,
}

impl UsageCounts {
    /// Counts for a document with the given references
    #[inline]
    #[must_use]
    pub const fn new(submission_count: u64, linked_brief_count: u64) -> Self {
        Self {
            submission_count,
            linked_brief_count,
        }
    }
}

/// Guard flags for destructive document actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUsage {
    pub locked: bool,
    pub in_use: bool,
    pub submission_count: u64,
    pub linked_brief_count: u64,
    pub can_unlock: bool,
    pub can_delete: bool,
}

impl DocumentUsage {
    /// Derive flags from lock state and counts
    #[must_use]
    pub const fn new(locked: bool, counts: UsageCounts) -> Self {
        let in_use = counts.submission_count > 0 || counts.linked_brief_count > 0;
        Self {
            locked,
            in_use,
            submission_count: counts.submission_count,
            linked_brief_count: counts.linked_brief_count,
            can_unlock: locked && !in_use,
            can_delete: !locked && !in_use,
        }
    }

    /// Usage of `document` given oracle counts
    #[inline]
    #[must_use]
    pub fn for_document(document: &ReferenceDocument, counts: UsageCounts) -> Self {
        Self::new(document.is_locked(), counts)
    }

    /// Nothing references the document
    #[inline]
    #[must_use]
    pub const fn unused(locked: bool) -> Self {
        Self::new(locked, UsageCounts::new(0, 0))
    }
}
