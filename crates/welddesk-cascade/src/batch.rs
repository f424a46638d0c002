//! Bounded write batching
//!
//! Accumulates field-level updates into write groups of at most
//! `max_group_ops` operations and flushes them one group at a time, in the
//! order the updates were added.
//!
//! There is no transaction spanning groups. If group *k* fails, groups
//! `1..k-1` stay applied and `k+1..n` are never attempted. Recovery is
//! re-running the same cascade, which skips what is already deleted.

use crate::error::CascadeError;
use std::num::NonZeroUsize;
use welddesk_store::{DocRef, FieldUpdates, Store};

type Op = (DocRef, FieldUpdates);

/// Outcome of a successful commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Groups written
    pub groups: usize,
    /// Operations written
    pub operations: usize,
}

/// Write accumulator that flushes in bounded groups
pub struct BatchWriter<'s, S: ?Sized> {
    store: &'s S,
    max_ops: NonZeroUsize,
    sealed: Vec<Vec<Op>>,
    current: Vec<Op>,
}

impl<'s, S: Store + ?Sized> BatchWriter<'s, S> {
    /// Create writer bounded by the store's group limit
    #[must_use]
    pub fn new(store: &'s S) -> Self {
        let max_ops = store.limits().max_group_ops;
        Self::with_max_ops(store, max_ops)
    }

    /// Create writer with an explicit group limit
    #[must_use]
    pub fn with_max_ops(store: &'s S, max_ops: NonZeroUsize) -> Self {
        Self {
            store,
            max_ops,
            sealed: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Queue an update; seals the current group when it reaches the limit
    pub fn add(&mut self, doc: DocRef, fields: FieldUpdates) {
        self.current.push((doc, fields));
        if self.current.len() == self.max_ops.get() {
            let full = std::mem::take(&mut self.current);
            self.sealed.push(full);
        }
    }

    /// Queued operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.sealed.iter().map(Vec::len).sum::<usize>() + self.current.len()
    }

    /// Whether nothing is queued
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sealed.is_empty() && self.current.is_empty()
    }

    /// Groups a commit would write
    #[inline]
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.sealed.len() + usize::from(!self.current.is_empty())
    }

    /// Operation counts per group, in commit order
    #[must_use]
    pub fn group_sizes(&self) -> Vec<usize> {
        self.groups().map(<[Op]>::len).collect()
    }

    fn groups(&self) -> impl Iterator<Item = &[Op]> {
        self.sealed
            .iter()
            .map(Vec::as_slice)
            .chain((!self.current.is_empty()).then_some(self.current.as_slice()))
    }

    /// Flush every group sequentially
    ///
    /// # Errors
    /// - `CascadeError::BatchCommitFailure` naming the failed group and how
    ///   many groups were already applied
    pub async fn commit(self) -> Result<CommitSummary, CascadeError> {
        let total = self.group_count();
        let mut summary = CommitSummary::default();

        for (index, ops) in self.groups().enumerate() {
            let mut group = self.store.write_group();
            for (doc, fields) in ops {
                group.update(doc.clone(), fields.clone());
            }

            if let Err(source) = group.commit().await {
                tracing::error!(
                    "Write group {}/{} failed after {} groups applied: {}",
                    index + 1,
                    total,
                    index,
                    source
                );
                return Err(CascadeError::BatchCommitFailure {
                    group: index + 1,
                    total,
                    committed: index,
                    source,
                });
            }

            summary.groups += 1;
            summary.operations += ops.len();
            tracing::debug!(
                "Committed write group {}/{} ({} operations)",
                index + 1,
                total,
                ops.len()
            );
        }

        Ok(summary)
    }
}

impl<S: ?Sized> std::fmt::Debug for BatchWriter<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("max_ops", &self.max_ops)
            .field("sealed", &self.sealed.len())
            .field("current", &self.current.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use welddesk_store::{fields, Document, EntityId, FieldValue, MemoryStore};

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn touch(i: usize) -> (DocRef, FieldUpdates) {
        let id = EntityId::new(format!("d{i}")).unwrap();
        let value = FieldValue::Int(i64::try_from(i).unwrap());
        (
            DocRef::new("docs".into(), id),
            FieldUpdates::new().set(fields::ORDER, value),
        )
    }

    fn store_with(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store.insert("docs", Document::new(EntityId::new(format!("d{i}")).unwrap()));
        }
        store
    }

    #[test]
    fn empty_writer_has_no_groups() {
        let store = MemoryStore::new();
        let writer = BatchWriter::new(&store);
        assert!(writer.is_empty());
        assert_eq!(writer.group_count(), 0);
    }

    #[test]
    fn seals_group_at_limit() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::with_max_ops(&store, limit(3));
        for i in 0..7 {
            let (doc, fields) = touch(i);
            writer.add(doc, fields);
        }
        assert_eq!(writer.group_sizes(), vec![3, 3, 1]);
        assert_eq!(writer.len(), 7);
    }

    #[tokio::test]
    async fn commit_flushes_groups_in_order() {
        let store = store_with(5);
        let mut writer = BatchWriter::with_max_ops(&store, limit(2));
        for i in 0..5 {
            let (doc, fields) = touch(i);
            writer.add(doc, fields);
        }

        let summary = writer.commit().await.unwrap();

        assert_eq!(summary, CommitSummary { groups: 3, operations: 5 });
        assert_eq!(store.stats().committed_groups, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn failed_group_keeps_earlier_groups_and_skips_later() {
        // d3 is never seeded, so the second group fails as a whole
        let store = store_with(3);
        store.insert("docs", Document::new(EntityId::new("d4").unwrap()));
        store.insert("docs", Document::new(EntityId::new("d5").unwrap()));

        let mut writer = BatchWriter::with_max_ops(&store, limit(2));
        for i in 0..6 {
            let (doc, fields) = touch(i);
            writer.add(doc, fields);
        }

        let err = writer.commit().await.unwrap_err();

        assert!(matches!(
            err,
            CascadeError::BatchCommitFailure { group: 2, total: 3, committed: 1, .. }
        ));
        assert_eq!(store.stats().committed_groups, vec![2]);
        let untouched = store
            .get(&DocRef::new("docs".into(), EntityId::new("d4").unwrap()))
            .unwrap()
            .unwrap();
        assert_eq!(untouched.order(), None);
    }

    proptest! {
        #[test]
        fn prop_group_sizing(ops in 0..2_000usize, l in 1..600usize) {
            let store = MemoryStore::new();
            let mut writer = BatchWriter::with_max_ops(&store, limit(l));
            for i in 0..ops {
                let (doc, fields) = touch(i);
                writer.add(doc, fields);
            }

            let sizes = writer.group_sizes();
            prop_assert_eq!(sizes.len(), ops.div_ceil(l));
            if let Some((_, full)) = sizes.split_last() {
                prop_assert!(full.iter().all(|&s| s == l));
            }
            prop_assert_eq!(sizes.iter().sum::<usize>(), ops);
        }
    }
}
