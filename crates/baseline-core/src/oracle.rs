//! Usage oracle
//!
//! Submission and brief-link counts live outside the governance core; the
//! service asks an oracle for them whenever a guard needs them.

use baseline_criteria::DocumentId;
use baseline_document::UsageCounts;
use dashmap::DashMap;

/// Supplies reference counts for a document
#[cfg_attr(test, mockall::automock)]
pub trait UsageOracle: Send + Sync {
    fn usage_counts(&self, document_id: DocumentId) -> UsageCounts;
}

/// Fixed counts keyed by document; unknown documents are unused
#[derive(Debug, Default)]
pub struct StaticUsage {
    counts: DashMap<DocumentId, UsageCounts>,
}

impl StaticUsage {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, document_id: DocumentId, counts: UsageCounts) {
        self.counts.insert(document_id, counts);
    }

    pub fn clear(&self, document_id: DocumentId) {
        self.counts.remove(&document_id);
    }
}

impl UsageOracle for StaticUsage {
    fn usage_counts(&self, document_id: DocumentId) -> UsageCounts {
        self.counts
            .get(&document_id)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }
}
