//! Governance audit events
//!
//! The service emits one [`GovernanceEvent`] per accepted change. Sinks
//! decide where events go; [`RecordingSink`] keeps a SHA-256 hash chain so
//! tampering with any recorded event is detectable.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use ulid::Ulid;

/// Event identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Ulid);

impl EventId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    DocumentUploaded,
    ExtractionRecorded,
    ExtractionFailed,
    DocumentReviewed,
    DocumentLocked,
    DocumentUnlocked,
    DocumentDeleted,
    DocumentArchived,
    DocumentUnarchived,
    UnitImported,
    BriefLocked,
    BriefSuperseded,
    /// Lock refused because another brief holds the slot
    BriefLockConflict,
    GradingScopeChanged,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentUploaded => "DOCUMENT_UPLOADED",
            Self::ExtractionRecorded => "EXTRACTION_RECORDED",
            Self::ExtractionFailed => "EXTRACTION_FAILED",
            Self::DocumentReviewed => "DOCUMENT_REVIEWED",
            Self::DocumentLocked => "DOCUMENT_LOCKED",
            Self::DocumentUnlocked => "DOCUMENT_UNLOCKED",
            Self::DocumentDeleted => "DOCUMENT_DELETED",
            Self::DocumentArchived => "DOCUMENT_ARCHIVED",
            Self::DocumentUnarchived => "DOCUMENT_UNARCHIVED",
            Self::UnitImported => "UNIT_IMPORTED",
            Self::BriefLocked => "BRIEF_LOCKED",
            Self::BriefSuperseded => "BRIEF_SUPERSEDED",
            Self::BriefLockConflict => "BRIEF_LOCK_CONFLICT",
            Self::GradingScopeChanged => "GRADING_SCOPE_CHANGED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceEvent {
    pub id: EventId,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub kind: EventKind,
    /// Id of the record the event is about
    pub subject: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl GovernanceEvent {
    #[must_use]
    pub fn new(kind: EventKind, actor: impl Into<String>, subject: impl fmt::Display) -> Self {
        Self {
            id: EventId::new(),
            at: Utc::now(),
            actor: actor.into(),
            kind,
            subject: subject.to_string(),
            before: None,
            after: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_before(mut self, before: Option<Value>) -> Self {
        self.before = before;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_after(mut self, after: Option<Value>) -> Self {
        self.after = after;
        self
    }
}

/// Sink failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("event log integrity violation at entry {index}")]
    IntegrityViolation { index: usize },

    #[error("event sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for audit events
pub trait EventSink: Send + Sync {
    fn record(&self, event: GovernanceEvent) -> Result<EventId, SinkError>;
}

/// Writes events to the tracing pipeline only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: GovernanceEvent) -> Result<EventId, SinkError> {
        tracing::info!(
            actor = %event.actor,
            subject = %event.subject,
            "Governance event {}",
            event.kind
        );
        Ok(event.id)
    }
}

/// Recorded event with its chain hashes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedEvent {
    pub event: GovernanceEvent,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

impl ChainedEvent {
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// In-memory hash-chained event log
#[derive(Debug, Default)]
pub struct RecordingSink {
    inner: Mutex<Vec<ChainedEvent>>,
}

impl RecordingSink {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChainedEvent> {
        self.inner.lock().clone()
    }

    /// Events about `subject`, oldest first
    pub fn events_for(&self, subject: &str) -> Vec<GovernanceEvent> {
        self.inner
            .lock()
            .iter()
            .filter(|e| e.event.subject == subject)
            .map(|e| e.event.clone())
            .collect()
    }

    /// Kinds in recording order
    pub fn kinds(&self) -> Vec<EventKind> {
        self.inner.lock().iter().map(|e| e.event.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn verify_integrity(&self) -> Result<(), SinkError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for (index, e) in guard.iter().enumerate() {
            if e.prev_hash != prev || e.hash != compute_hash(&e.event, &e.prev_hash) {
                return Err(SinkError::IntegrityViolation { index });
            }
            prev = e.hash;
        }
        Ok(())
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: GovernanceEvent) -> Result<EventId, SinkError> {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map_or([0u8; 32], |e| e.hash);
        let hash = compute_hash(&event, &prev_hash);
        let id = event.id;
        guard.push(ChainedEvent {
            event,
            prev_hash,
            hash,
        });
        Ok(id)
    }
}

fn compute_hash(event: &GovernanceEvent, prev_hash: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.id.0.to_bytes());
    hasher.update(event.at.to_rfc3339().as_bytes());
    hasher.update(event.actor.as_bytes());
    hasher.update([0]);
    hasher.update(event.kind.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(event.subject.as_bytes());
    hasher.update([0]);
    for snapshot in [&event.before, &event.after] {
        if let Some(value) = snapshot {
            hasher.update(value.to_string().as_bytes());
        }
        hasher.update([0]);
    }
    hasher.update(prev_hash);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: EventKind, subject: &str) -> GovernanceEvent {
        GovernanceEvent::new(kind, "tutor", subject)
            .with_before(Some(json!({"status": "EXTRACTED"})))
            .with_after(Some(json!({"status": "LOCKED"})))
    }

    #[test]
    fn chain_links_events() {
        let sink = RecordingSink::new();
        sink.record(event(EventKind::DocumentUploaded, "a")).unwrap();
        sink.record(event(EventKind::DocumentLocked, "a")).unwrap();
        sink.record(event(EventKind::BriefLocked, "b")).unwrap();

        let events = sink.events();
        assert_eq!(events[0].prev_hash, [0u8; 32]);
        assert_eq!(events[1].prev_hash, events[0].hash);
        assert_eq!(events[0].hash_hex().len(), 64);
        assert!(sink.verify_integrity().is_ok());
        assert_eq!(sink.events_for("a").len(), 2);
        assert_eq!(
            sink.kinds(),
            vec![EventKind::DocumentUploaded, EventKind::DocumentLocked, EventKind::BriefLocked]
        );
    }

    #[test]
    fn tampering_is_detected() {
        let sink = RecordingSink::new();
        sink.record(event(EventKind::DocumentUploaded, "a")).unwrap();
        sink.record(event(EventKind::DocumentLocked, "a")).unwrap();
        sink.inner.lock()[0].event.actor = "someone else".into();
        assert_eq!(
            sink.verify_integrity(),
            Err(SinkError::IntegrityViolation { index: 0 })
        );
    }

    #[test]
    fn kind_serializes_screaming_snake() {
        let value = serde_json::to_value(EventKind::GradingScopeChanged).unwrap();
        assert_eq!(value, json!("GRADING_SCOPE_CHANGED"));
        assert_eq!(EventKind::GradingScopeChanged.to_string(), "GRADING_SCOPE_CHANGED");
    }

    #[test]
    fn lock_conflict_kind_has_stable_name() {
        let value = serde_json::to_value(EventKind::BriefLockConflict).unwrap();
        assert_eq!(value, json!("BRIEF_LOCK_CONFLICT"));
        assert_eq!(EventKind::BriefLockConflict.as_str(), "BRIEF_LOCK_CONFLICT");
    }
}
