//! Reference document record
//!
//! [`ReferenceDocument`] keeps `status` and `locked_at` private: the only
//! writer is [`ReferenceDocument::set_status`], so `locked_at` is set exactly
//! when the status is `LOCKED`. Deserialization re-checks the same rule.

use crate::draft::Draft;
use crate::error::LifecycleError;
use baseline_criteria::DocumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Kind of uploaded reference document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    /// Unit specification
    Spec,
    /// Assignment brief
    Brief,
    /// Marking rubric
    Rubric,
}

impl DocumentKind {
    /// Loose parse used for extraction payloads
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "SPEC" | "SPECIFICATION" => Some(Self::Spec),
            "BRIEF" | "ASSIGNMENT_BRIEF" => Some(Self::Brief),
            "RUBRIC" => Some(Self::Rubric),
            _ => None,
        }
    }
}

impl Display for DocumentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spec => "SPEC",
            Self::Brief => "BRIEF",
            Self::Rubric => "RUBRIC",
        })
    }
}

/// Extraction/lock status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Stored, not yet extracted
    Uploaded,
    /// Draft available
    Extracted,
    /// Draft reviewed by a human
    Reviewed,
    /// Authoritative grading baseline
    Locked,
    /// Extraction failed
    Failed,
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uploaded => "UPLOADED",
            Self::Extracted => "EXTRACTED",
            Self::Reviewed => "REVIEWED",
            Self::Locked => "LOCKED",
            Self::Failed => "FAILED",
        })
    }
}

/// Source metadata bag
///
/// Known keys are typed; anything else the upload layer stored survives in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_issue: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Uploaded file plus its extraction state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DocumentRecord", into = "DocumentRecord")]
pub struct ReferenceDocument {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub title: String,
    pub version: u32,
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
    pub source_meta: SourceMeta,
    /// Bumped by the store on every write; used for conditional updates
    pub revision: u64,
    status: DocumentStatus,
    locked_at: Option<DateTime<Utc>>,
    extracted_draft: Option<Draft>,
    extraction_warnings: Vec<String>,
    last_error: Option<String>,
}

impl ReferenceDocument {
    /// Freshly uploaded document
    ///
    /// `version` is clamped to at least 1.
    #[must_use]
    pub fn new(
        kind: DocumentKind,
        title: impl Into<String>,
        checksum: impl Into<String>,
        version: u32,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            kind,
            title: title.into(),
            version: version.max(1),
            checksum: checksum.into(),
            uploaded_at,
            source_meta: SourceMeta::default(),
            revision: 0,
            status: DocumentStatus::Uploaded,
            locked_at: None,
            extracted_draft: None,
            extraction_warnings: Vec::new(),
            last_error: None,
        }
    }

    /// Attach source metadata
    #[must_use]
    pub fn with_source_meta(mut self, meta: SourceMeta) -> Self {
        self.source_meta = meta;
        self
    }

    /// Current status
    #[inline]
    #[must_use]
    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    /// Lock timestamp, present iff the status is `LOCKED`
    #[inline]
    #[must_use]
    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        self.locked_at
    }

    /// True when the status is `LOCKED`
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.status == DocumentStatus::Locked
    }

    /// Archived flag (default-list visibility only)
    #[inline]
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.source_meta.archived
    }

    /// Last extracted draft
    #[inline]
    #[must_use]
    pub fn extracted_draft(&self) -> Option<&Draft> {
        self.extracted_draft.as_ref()
    }

    /// Warnings from the last extraction, in producer order
    #[inline]
    #[must_use]
    pub fn extraction_warnings(&self) -> &[String] {
        &self.extraction_warnings
    }

    /// Message of the last failed extraction
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Unit code from metadata, falling back to the draft's guess
    #[must_use]
    pub fn unit_code(&self) -> Option<&str> {
        non_blank(self.source_meta.unit_code.as_deref())
            .or_else(|| non_blank(self.extracted_draft.as_ref().and_then(Draft::unit_code)))
    }

    /// Assignment code from metadata, falling back to the draft
    #[must_use]
    pub fn assignment_code(&self) -> Option<&str> {
        non_blank(self.source_meta.assignment_code.as_deref())
            .or_else(|| non_blank(self.extracted_draft.as_ref().and_then(Draft::assignment_code)))
    }

    /// Set status and keep `locked_at` in step
    ///
    /// Entering `LOCKED` stamps `now`; staying `LOCKED` keeps the original
    /// stamp; any other status clears it.
    pub(crate) fn set_status(&mut self, status: DocumentStatus, now: DateTime<Utc>) {
        self.locked_at = match (status, self.locked_at) {
            (DocumentStatus::Locked, Some(existing)) => Some(existing),
            (DocumentStatus::Locked, None) => Some(now),
            _ => None,
        };
        self.status = status;
    }

    /// Overwrite the draft and warnings from a new extraction
    pub(crate) fn replace_extraction(&mut self, draft: Draft, warnings: Vec<String>) {
        self.extracted_draft = Some(draft);
        self.extraction_warnings = warnings;
        self.last_error = None;
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.last_error = Some(message);
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Wire/storage shape of [`ReferenceDocument`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRecord {
    id: DocumentId,
    kind: DocumentKind,
    status: DocumentStatus,
    title: String,
    version: u32,
    checksum: String,
    uploaded_at: DateTime<Utc>,
    locked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    extracted_draft: Option<Draft>,
    #[serde(default)]
    extraction_warnings: Vec<String>,
    #[serde(default)]
    last_error: Option<String>,
    #[serde(default)]
    source_meta: SourceMeta,
    #[serde(default)]
    revision: u64,
}

impl TryFrom<DocumentRecord> for ReferenceDocument {
    type Error = LifecycleError;

    fn try_from(record: DocumentRecord) -> Result<Self, Self::Error> {
        let locked = record.status == DocumentStatus::Locked;
        if locked != record.locked_at.is_some() {
            return Err(LifecycleError::InvalidRecord(format!(
                "status {} with lockedAt {}",
                record.status,
                if record.locked_at.is_some() { "set" } else { "unset" }
            )));
        }
        if record.version == 0 {
            return Err(LifecycleError::InvalidRecord("version must be positive".to_string()));
        }
        Ok(Self {
            id: record.id,
            kind: record.kind,
            title: record.title,
            version: record.version,
            checksum: record.checksum,
            uploaded_at: record.uploaded_at,
            source_meta: record.source_meta,
            revision: record.revision,
            status: record.status,
            locked_at: record.locked_at,
            extracted_draft: record.extracted_draft,
            extraction_warnings: record.extraction_warnings,
            last_error: record.last_error,
        })
    }
}

impl From<ReferenceDocument> for DocumentRecord {
    fn from(doc: ReferenceDocument) -> Self {
        Self {
            id: doc.id,
            kind: doc.kind,
            status: doc.status,
            title: doc.title,
            version: doc.version,
            checksum: doc.checksum,
            uploaded_at: doc.uploaded_at,
            locked_at: doc.locked_at,
            extracted_draft: doc.extracted_draft,
            extraction_warnings: doc.extraction_warnings,
            last_error: doc.last_error,
            source_meta: doc.source_meta,
            revision: doc.revision,
        }
    }
}
