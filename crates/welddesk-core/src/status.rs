//! Lifecycle status transitions
//!
//! `active ⇄ archived`, `active | archived → deleted`. `deleted` is terminal;
//! restoring deleted records is not supported. Re-applying the current status
//! is accepted and writes nothing.

use welddesk_store::EntityStatus;

/// Status change not allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition: {from} -> {to}")]
pub struct TransitionError {
    /// Current status
    pub from: EntityStatus,
    /// Requested status
    pub to: EntityStatus,
}

/// Validate a status change
///
/// # Errors
/// - `TransitionError` if `to` is not reachable from `from`
pub fn validate_transition(from: EntityStatus, to: EntityStatus) -> Result<(), TransitionError> {
    if from == to || allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// Statuses reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: EntityStatus) -> &'static [EntityStatus] {
    use EntityStatus::{Active, Archived, Deleted};
    match from {
        Active => &[Archived, Deleted],
        Archived => &[Active, Deleted],
        Deleted => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use EntityStatus::{Active, Archived, Deleted};

    #[test]
    fn archive_and_restore_are_allowed() {
        assert!(validate_transition(Active, Archived).is_ok());
        assert!(validate_transition(Archived, Active).is_ok());
    }

    #[test]
    fn delete_is_allowed_from_any_live_status() {
        assert!(validate_transition(Active, Deleted).is_ok());
        assert!(validate_transition(Archived, Deleted).is_ok());
    }

    #[test]
    fn deleted_is_terminal() {
        assert_eq!(
            validate_transition(Deleted, Active),
            Err(TransitionError { from: Deleted, to: Active })
        );
        assert!(validate_transition(Deleted, Archived).is_err());
        assert!(allowed_transitions(Deleted).is_empty());
    }

    #[test]
    fn same_status_is_noop() {
        for status in [Active, Archived, Deleted] {
            assert!(validate_transition(status, status).is_ok());
        }
    }
}
