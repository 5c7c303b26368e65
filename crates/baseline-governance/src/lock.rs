//! Brief lock conflict resolution
//!
//! At most one non-archived brief per (unit, assignment code) holds a lock.
//! [`resolve_lock`] checks a candidate against the existing briefs and either
//! clears it, asks the caller to confirm an overwrite, or accepts a confirmed
//! overwrite that supersedes the current holder.

use crate::brief::{normalize_assignment_code, AssignmentBrief};
use crate::error::LockConflict;
use baseline_criteria::{BriefId, UnitId};
use baseline_document::ConflictClearance;
use serde::{Deserialize, Serialize};

/// Caller acknowledgement of a specific conflict
///
/// Naming the existing brief id prevents a stale confirmation from
/// overwriting a lock taken after the caller last looked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverwriteConfirmation {
    pub existing_brief_id: BriefId,
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDecision {
    /// No other brief holds the lock
    Clear(ConflictClearance),
    /// Confirmed overwrite; `previous` must be superseded in the same write
    Supersede {
        previous: BriefId,
        clearance: ConflictClearance,
    },
}

impl LockDecision {
    #[inline]
    #[must_use]
    pub fn clearance(&self) -> &ConflictClearance {
        match self {
            Self::Clear(clearance) | Self::Supersede { clearance, .. } => clearance,
        }
    }

    #[inline]
    #[must_use]
    pub fn superseded(&self) -> Option<BriefId> {
        match self {
            Self::Clear(_) => None,
            Self::Supersede { previous, .. } => Some(*previous),
        }
    }
}

/// Locked briefs other than `candidate` competing for the same slot
pub fn lock_holders<'a, 'c, I>(
    unit_id: UnitId,
    assignment_code: &'c str,
    candidate: BriefId,
    briefs: I,
) -> impl Iterator<Item = &'a AssignmentBrief> + 'c
where
    'a: 'c,
    I: IntoIterator<Item = &'a AssignmentBrief>,
    I::IntoIter: 'c,
{
    briefs.into_iter().filter(move |brief| {
        brief.id != candidate && brief.holds_lock() && brief.targets(unit_id, assignment_code)
    })
}

/// Decide whether `candidate` may lock for `unit_id` / `assignment_code`
///
/// Returns [`LockConflict`] for the first competing holder that the
/// confirmation does not name. A confirmation naming a brief that no longer
/// holds the lock is ignored.
pub fn resolve_lock<'a, I>(
    unit_id: UnitId,
    assignment_code: &str,
    candidate: BriefId,
    briefs: I,
    confirmation: Option<&OverwriteConfirmation>,
) -> Result<LockDecision, LockConflict>
where
    I: IntoIterator<Item = &'a AssignmentBrief>,
    I::IntoIter: 'a,
{
    let assignment_code = normalize_assignment_code(assignment_code);
    let mut holders: Vec<&AssignmentBrief> =
        lock_holders(unit_id, &assignment_code, candidate, briefs).collect();
    holders.sort_by_key(|brief| (brief.locked_at, brief.id));

    let clearance = ConflictClearance {
        unit_id,
        assignment_code: assignment_code.clone(),
    };

    let confirmed = confirmation.map(|c| c.existing_brief_id);
    match holders.as_slice() {
        [] => Ok(LockDecision::Clear(clearance)),
        [only] if Some(only.id) == confirmed => {
            tracing::info!(
                "Lock overwrite confirmed for {}: superseding brief {}",
                assignment_code,
                only.id
            );
            Ok(LockDecision::Supersede {
                previous: only.id,
                clearance,
            })
        }
        holders => {
            let existing = holders
                .iter()
                .find(|brief| Some(brief.id) != confirmed)
                .unwrap_or(&holders[0]);
            tracing::info!(
                "Lock conflict for {}: brief {} already locked",
                assignment_code,
                existing.id
            );
            Err(LockConflict {
                existing_brief_id: existing.id,
                existing_document_id: existing.brief_document_id,
                existing_title: existing.title.clone(),
                unit_id,
                assignment_code,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseline_criteria::DocumentId;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn locked(unit_id: UnitId, code: &str, title: &str) -> AssignmentBrief {
        let mut brief = AssignmentBrief::new(unit_id, code, DocumentId::new(), title);
        brief.lock(Utc::now());
        brief
    }

    #[test]
    fn clear_when_no_holder() {
        let unit = UnitId::new();
        let other_unit = locked(UnitId::new(), "A1", "Other unit");
        let other_code = locked(unit, "A2", "Other assignment");
        let decision =
            resolve_lock(unit, "A1", BriefId::new(), [&other_unit, &other_code], None).unwrap();
        assert_eq!(decision.superseded(), None);
        assert_eq!(decision.clearance().assignment_code, "A1");
    }

    #[test]
    fn conflict_names_existing_holder() {
        let unit = UnitId::new();
        let existing = locked(unit, "A1", "Forces v1");
        let err = resolve_lock(unit, " a1", BriefId::new(), [&existing], None).unwrap_err();
        assert_eq!(err.existing_brief_id, existing.id);
        assert_eq!(err.existing_title, "Forces v1");
        assert_eq!(err.assignment_code, "A1");
    }

    #[test]
    fn candidate_does_not_conflict_with_itself() {
        let unit = UnitId::new();
        let existing = locked(unit, "A1", "Forces v1");
        assert!(resolve_lock(unit, "A1", existing.id, [&existing], None).is_ok());
    }

    #[test]
    fn archived_and_unlocked_briefs_are_ignored() {
        let unit = UnitId::new();
        let mut archived = locked(unit, "A1", "Old");
        archived.archived = true;
        let unlocked = AssignmentBrief::new(unit, "A1", DocumentId::new(), "Draft");
        assert!(resolve_lock(unit, "A1", BriefId::new(), [&archived, &unlocked], None).is_ok());
    }

    #[test]
    fn confirmed_overwrite_supersedes() {
        let unit = UnitId::new();
        let existing = locked(unit, "A1", "Forces v1");
        let confirmation = OverwriteConfirmation {
            existing_brief_id: existing.id,
        };
        let decision =
            resolve_lock(unit, "A1", BriefId::new(), [&existing], Some(&confirmation)).unwrap();
        assert_eq!(decision.superseded(), Some(existing.id));
    }

    #[test]
    fn stale_confirmation_returns_fresh_conflict() {
        let unit = UnitId::new();
        let current = locked(unit, "A1", "Forces v2");
        let stale = OverwriteConfirmation {
            existing_brief_id: BriefId::new(),
        };
        let err = resolve_lock(unit, "A1", BriefId::new(), [&current], Some(&stale)).unwrap_err();
        assert_eq!(err.existing_brief_id, current.id);
    }

    #[test]
    fn multiple_holders_report_unconfirmed_one() {
        let unit = UnitId::new();
        let mut first = locked(unit, "A1", "First");
        first.locked_at = Some(Utc::now() - Duration::days(1));
        let second = locked(unit, "A1", "Second");
        let confirmation = OverwriteConfirmation {
            existing_brief_id: first.id,
        };
        let err = resolve_lock(unit, "A1", BriefId::new(), [&first, &second], Some(&confirmation))
            .unwrap_err();
        assert_eq!(err.existing_brief_id, second.id);
    }

    #[test]
    fn lock_holders_filters_slot() {
        let unit = UnitId::new();
        let a = locked(unit, "A1", "a");
        let b = locked(unit, "A2", "b");
        let briefs = vec![a.clone(), b];
        let holders: Vec<_> = lock_holders(unit, "A1", BriefId::new(), &briefs).collect();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].id, a.id);
    }

    #[test]
    fn resolver_conflicts_only_with_lock_holders() {
        let unit = UnitId::new();
        let candidate = locked(unit, "A1", "Candidate");
        let holder = locked(unit, " a 1", "Holder");
        let other_slot = locked(unit, "A2", "Other");
        let briefs = vec![candidate.clone(), holder.clone(), other_slot];

        let holders: Vec<BriefId> = lock_holders(unit, "A1", candidate.id, &briefs)
            .map(|brief| brief.id)
            .collect();
        assert_eq!(holders, vec![holder.id]);

        let err = resolve_lock(unit, "a1", candidate.id, &briefs, None).unwrap_err();
        assert_eq!(err.existing_brief_id, holder.id);
        assert_eq!(err.assignment_code, "A1");
    }
}
