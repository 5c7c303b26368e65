use crate::document::DocumentStatus;
use crate::error::LifecycleError;
use crate::lifecycle::LifecycleAction;

/// Validates a status transition for `action`.
///
/// Self-transitions are listed explicitly: re-extracting an extracted
/// document and a forced re-extract of a locked one both keep their status.
/// Force and usage guards are checked by the lifecycle functions.
pub fn validate_transition(
    action: LifecycleAction,
    from: DocumentStatus,
    to: DocumentStatus,
) -> Result<(), LifecycleError> {
    if action_targets(action, from).contains(&to) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition { action, from })
    }
}

/// Statuses `action` may produce from `from`
///
/// Delete, archive and unarchive never change status and have no entries.
pub fn action_targets(action: LifecycleAction, from: DocumentStatus) -> Vec<DocumentStatus> {
    use DocumentStatus::*;
    use LifecycleAction as A;
    match (action, from) {
        (A::Extract, Locked) => vec![Locked],
        (A::Extract, _) => vec![Extracted],
        (A::FailExtraction, Uploaded | Extracted | Reviewed | Failed) => vec![Failed],
        (A::Review, Extracted | Reviewed) => vec![Reviewed],
        (A::Lock, Extracted | Reviewed) => vec![Locked],
        (A::Unlock, Locked) => vec![Extracted],
        _ => Vec::new(),
    }
}

/// Every status reachable from `from` by some action
pub fn allowed_transitions(from: DocumentStatus) -> Vec<DocumentStatus> {
    [
        LifecycleAction::Extract,
        LifecycleAction::FailExtraction,
        LifecycleAction::Review,
        LifecycleAction::Lock,
        LifecycleAction::Unlock,
    ]
    .into_iter()
    .flat_map(|action| action_targets(action, from))
    .collect()
}
