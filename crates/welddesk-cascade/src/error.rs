//! Error types for the cascade engine
//!
//! Provides error handling for:
//! - Read failures while selecting descendants
//! - Write group failures while committing
//! - Graphs that reference unresolvable collections or fields

use serde::Serialize;
use std::fmt;
use welddesk_store::{CollectionId, DocRef, StoreError};

/// Position of a cascade invocation in its state machine
///
/// `Start → SelectRoot → ProcessEdge(0..E) → Commit → Done`, with `Failed`
/// reachable from `SelectRoot`, any `ProcessEdge` and `Commit`. A preview
/// stops at `Planned` instead of `Commit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CascadePhase {
    /// Nothing done yet
    Start,
    /// Reading and enqueueing the root
    SelectRoot,
    /// Reading the edge at this declaration index
    ProcessEdge(usize),
    /// Flushing write groups
    Commit,
    /// Selection finished, nothing written (preview)
    Planned,
    /// All groups applied
    Done,
    /// Aborted by an error
    Failed,
}

impl CascadePhase {
    /// Whether `next` may follow `self`
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        use CascadePhase::{Commit, Done, Failed, Planned, ProcessEdge, SelectRoot, Start};
        match (self, next) {
            (Start, SelectRoot)
            | (SelectRoot, ProcessEdge(0) | Commit | Planned)
            | (ProcessEdge(_), Commit | Planned)
            | (Commit, Done)
            | (SelectRoot | ProcessEdge(_) | Commit, Failed) => true,
            (ProcessEdge(i), ProcessEdge(j)) => j == i + 1,
            _ => false,
        }
    }
}

impl fmt::Display for CascadePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::SelectRoot => f.write_str("select-root"),
            Self::ProcessEdge(i) => write!(f, "edge #{i}"),
            Self::Commit => f.write_str("commit"),
            Self::Planned => f.write_str("planned"),
            Self::Done => f.write_str("done"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Cascade invocation errors
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    /// A read failed; nothing was written by this invocation
    #[error("query failed during {phase}: {source}")]
    QueryFailure {
        /// Phase that issued the read
        phase: CascadePhase,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// A write group failed; earlier groups remain applied
    #[error("write group {group} of {total} failed ({committed} already applied): {source}")]
    BatchCommitFailure {
        /// One-based index of the failed group
        group: usize,
        /// Groups in the batch
        total: usize,
        /// Groups durably applied before the failure
        committed: usize,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// The root document does not exist
    #[error("cascade root not found: {0}")]
    RootNotFound(DocRef),
}

impl CascadeError {
    /// Phase in which the invocation failed
    #[must_use]
    pub fn phase(&self) -> CascadePhase {
        match self {
            Self::QueryFailure { phase, .. } => *phase,
            Self::BatchCommitFailure { .. } => CascadePhase::Commit,
            Self::RootNotFound(_) => CascadePhase::SelectRoot,
        }
    }

    /// Whether some writes of this invocation were applied
    #[inline]
    #[must_use]
    pub fn is_partially_applied(&self) -> bool {
        matches!(self, Self::BatchCommitFailure { committed, .. } if *committed > 0)
    }

    /// Whether re-running the same cascade may succeed
    ///
    /// Re-running is always safe; this only says whether it is useful.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QueryFailure { .. } | Self::BatchCommitFailure { .. }
        )
    }
}

/// Cascade graph construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidGraphError {
    /// Collection not present in the schema
    #[error("unknown collection: {0}")]
    UnknownCollection(CollectionId),

    /// Field not declared on the collection
    #[error("unknown field '{field}' on collection {collection}")]
    UnknownField {
        /// Collection
        collection: CollectionId,
        /// Missing field
        field: String,
    },

    /// Edge without foreign key
    #[error("edge #{edge} into {collection} has an empty foreign key")]
    EmptyForeignKey {
        /// Declaration index
        edge: usize,
        /// Child collection
        collection: CollectionId,
    },

    /// Edge consumes ids that no earlier edge produces
    #[error("edge #{edge} consumes {parent} ids before any edge produces them")]
    ParentNotProduced {
        /// Declaration index
        edge: usize,
        /// Parent collection
        parent: CollectionId,
    },

    /// Same edge declared twice
    #[error("edge #{edge} duplicates an earlier edge")]
    DuplicateEdge {
        /// Declaration index
        edge: usize,
    },

    /// Edge produces ids for a collection an earlier edge already consumed
    #[error("edge #{edge} produces {collection} ids after an edge consumed them")]
    ProducedAfterConsumer {
        /// Declaration index
        edge: usize,
        /// Collection consumed too early
        collection: CollectionId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use welddesk_store::EntityId;

    #[test]
    fn phase_transitions_follow_state_machine() {
        use CascadePhase::*;
        assert!(Start.can_advance_to(SelectRoot));
        assert!(SelectRoot.can_advance_to(ProcessEdge(0)));
        assert!(SelectRoot.can_advance_to(Commit));
        assert!(ProcessEdge(0).can_advance_to(ProcessEdge(1)));
        assert!(ProcessEdge(3).can_advance_to(Commit));
        assert!(Commit.can_advance_to(Done));
        assert!(Commit.can_advance_to(Failed));
        assert!(ProcessEdge(2).can_advance_to(Planned));
        assert!(SelectRoot.can_advance_to(Planned));

        assert!(!Start.can_advance_to(Failed));
        assert!(!ProcessEdge(0).can_advance_to(ProcessEdge(2)));
        assert!(!Done.can_advance_to(Failed));
        assert!(!Commit.can_advance_to(SelectRoot));
        assert!(!Planned.can_advance_to(Commit));
        assert!(!Planned.can_advance_to(Done));
    }

    #[test]
    fn commit_failure_reports_partial_application() {
        let err = CascadeError::BatchCommitFailure {
            group: 2,
            total: 3,
            committed: 1,
            source: StoreError::Unavailable("quota".to_string()),
        };
        assert!(err.is_partially_applied());
        assert!(err.is_retryable());
        assert_eq!(err.phase(), CascadePhase::Commit);
        assert!(err.to_string().contains("write group 2 of 3"));
    }

    #[test]
    fn missing_root_is_not_retryable() {
        let err = CascadeError::RootNotFound(DocRef::new(
            "projects".into(),
            EntityId::new("p1").unwrap(),
        ));
        assert!(!err.is_retryable());
        assert!(!err.is_partially_applied());
    }
}
