//! Cascading soft-delete engine
//!
//! Walks a `CascadeGraph` from one root record and marks the root and every
//! transitive dependent `deleted`.
//!
//! # Invocation
//! 1. Select the root (skipped if already deleted)
//! 2. For each edge in declaration order, query children of the parent ids in
//!    filter-sized chunks and enqueue a soft delete for each live match
//! 3. Commit the batch, one bounded write group at a time
//!
//! All reads finish before the first write, so a read failure leaves the
//! store untouched. A write failure leaves earlier groups applied; calling
//! `delete_root` again finishes the job and writes nothing twice.

use crate::batch::BatchWriter;
use crate::chunk::chunk;
use crate::error::{CascadeError, CascadePhase};
use crate::graph::{CascadeEdge, CascadeGraph, ParentSource};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use welddesk_store::{
    fields, ActorId, CollectionId, DocRef, EntityId, EntityStatus, FieldUpdates, FieldValue,
    Filter, Query, Store, StoreLimits,
};

/// Per-edge selection figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeReport {
    /// Child collection
    pub collection: CollectionId,
    /// Foreign key followed
    pub foreign_key: String,
    /// Parent ids the edge started from
    pub parent_ids: usize,
    /// Chunked queries issued
    pub queries: usize,
    /// Live records found
    pub matched: usize,
    /// Records found already deleted (kept only to reach their children)
    pub already_deleted: usize,
    /// Soft deletes enqueued (matches not already enqueued by another edge)
    pub enqueued: usize,
}

impl EdgeReport {
    fn new(edge: &CascadeEdge, parent_ids: usize) -> Self {
        Self {
            collection: edge.child.clone(),
            foreign_key: edge.foreign_key.clone(),
            parent_ids,
            queries: 0,
            matched: 0,
            already_deleted: 0,
            enqueued: 0,
        }
    }
}

/// Outcome of a cascade invocation or preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Root record
    pub root: DocRef,
    /// Whether the root itself was live and enqueued
    pub root_enqueued: bool,
    /// Figures per edge, in processing order
    pub edges: Vec<EdgeReport>,
    /// Soft deletes enqueued
    pub planned_writes: usize,
    /// Write groups those deletes need
    pub planned_groups: usize,
    /// Write groups applied (always 0 for a preview)
    pub committed_groups: usize,
    /// Final phase reached
    pub phase: CascadePhase,
}

impl CascadeReport {
    fn new(root: DocRef) -> Self {
        Self {
            root,
            root_enqueued: false,
            edges: Vec::new(),
            planned_writes: 0,
            planned_groups: 0,
            committed_groups: 0,
            phase: CascadePhase::Start,
        }
    }

    /// Total queries issued, root lookup included
    #[must_use]
    pub fn queries(&self) -> usize {
        1 + self.edges.iter().map(|e| e.queries).sum::<usize>()
    }

    /// Enqueued deletes for one collection
    #[must_use]
    pub fn enqueued_in(&self, collection: &CollectionId) -> usize {
        let root = usize::from(self.root_enqueued && &self.root.collection == collection);
        root + self
            .edges
            .iter()
            .filter(|e| &e.collection == collection)
            .map(|e| e.enqueued)
            .sum::<usize>()
    }

    /// Whether the invocation had nothing left to delete
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.planned_writes == 0
    }

    fn advance(&mut self, next: CascadePhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal cascade transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!("Cascade of {}: {} -> {}", self.root, self.phase, next);
        self.phase = next;
    }
}

/// Generic cascade engine over any `Store`
#[derive(Debug)]
pub struct CascadeDeleteEngine<S: ?Sized> {
    store: Arc<S>,
    limits: StoreLimits,
}

impl<S: Store + ?Sized> CascadeDeleteEngine<S> {
    /// Create engine bounded by the store's limits
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        let limits = store.limits();
        Self { store, limits }
    }

    /// Tighten limits below the store's (never above)
    #[must_use]
    pub fn with_limits(mut self, limits: StoreLimits) -> Self {
        self.limits = self.store.limits().min(limits);
        self
    }

    /// Effective limits
    #[inline]
    #[must_use]
    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    /// Soft-delete `root_id` and everything `graph` reaches from it
    ///
    /// Every write sets `status`, `deletedAt`, `deletedBy`, `updatedAt` and
    /// `updatedBy`. Re-running against the same root is always safe.
    ///
    /// # Errors
    /// - `CascadeError::RootNotFound` if the root document does not exist
    /// - `CascadeError::QueryFailure` if any read fails (nothing written)
    /// - `CascadeError::BatchCommitFailure` if a write group fails (earlier
    ///   groups stay applied)
    pub async fn delete_root(
        &self,
        graph: &CascadeGraph,
        root_id: &EntityId,
        actor: &ActorId,
    ) -> Result<CascadeReport, CascadeError> {
        tracing::info!("Cascading delete of {}/{} by {}", graph.root(), root_id, actor);

        let deleted = FieldUpdates::status_change(EntityStatus::Deleted, actor, self.store.now());
        let mut writer = BatchWriter::with_max_ops(&*self.store, self.limits.max_group_ops);
        let mut report = CascadeReport::new(graph.root().doc(root_id));

        let selected = self
            .select(graph, root_id, &mut report, |doc| writer.add(doc, deleted.clone()))
            .await;
        if let Err(e) = selected {
            report.advance(CascadePhase::Failed);
            tracing::error!("Cascade of {} aborted before writing: {}", report.root, e);
            return Err(e);
        }

        report.planned_writes = writer.len();
        report.planned_groups = writer.group_count();
        report.advance(CascadePhase::Commit);

        match writer.commit().await {
            Ok(summary) => {
                report.committed_groups = summary.groups;
                report.advance(CascadePhase::Done);
                tracing::info!(
                    "Cascade of {} complete: {} records deleted in {} groups",
                    report.root,
                    summary.operations,
                    summary.groups
                );
                Ok(report)
            }
            Err(e) => {
                report.advance(CascadePhase::Failed);
                tracing::warn!("Cascade of {} partially applied, safe to retry: {}", report.root, e);
                Err(e)
            }
        }
    }

    /// Run selection only and report what `delete_root` would write
    ///
    /// The report ends in `CascadePhase::Planned`.
    ///
    /// # Errors
    /// - `CascadeError::RootNotFound` if the root document does not exist
    /// - `CascadeError::QueryFailure` if any read fails
    pub async fn preview(
        &self,
        graph: &CascadeGraph,
        root_id: &EntityId,
    ) -> Result<CascadeReport, CascadeError> {
        let mut report = CascadeReport::new(graph.root().doc(root_id));
        let mut planned = 0usize;

        let selected = self
            .select(graph, root_id, &mut report, |_| planned += 1)
            .await;
        if let Err(e) = selected {
            report.advance(CascadePhase::Failed);
            return Err(e);
        }

        report.planned_writes = planned;
        report.planned_groups = planned.div_ceil(self.limits.max_group_ops.get());
        report.advance(CascadePhase::Planned);
        tracing::debug!(
            "Cascade preview of {}: {} writes in {} groups",
            report.root,
            report.planned_writes,
            report.planned_groups
        );
        Ok(report)
    }

    async fn select<F>(
        &self,
        graph: &CascadeGraph,
        root_id: &EntityId,
        report: &mut CascadeReport,
        mut enqueue: F,
    ) -> Result<(), CascadeError>
    where
        F: FnMut(DocRef) + Send,
    {
        report.advance(CascadePhase::SelectRoot);
        let root_query = Query::new(graph.root().clone()).filter(Filter::equals(fields::ID, root_id));
        let root = self
            .store
            .query(&root_query)
            .await
            .map_err(|source| CascadeError::QueryFailure {
                phase: CascadePhase::SelectRoot,
                source,
            })?
            .into_iter()
            .next()
            .ok_or_else(|| CascadeError::RootNotFound(report.root.clone()))?;

        let mut enqueued: HashSet<DocRef> = HashSet::new();
        if root.is_deleted() {
            tracing::debug!("Root {} already deleted, resuming descendants", report.root);
        } else {
            enqueued.insert(root.doc.clone());
            enqueue(root.doc);
            report.root_enqueued = true;
        }

        // Ids later edges consume, keyed by the collection that produced them
        let mut produced: HashMap<CollectionId, IndexSet<EntityId>> = HashMap::new();

        for (index, edge) in graph.edges().iter().enumerate() {
            let phase = CascadePhase::ProcessEdge(index);
            report.advance(phase);

            let parent_ids: Vec<EntityId> = match &edge.parent {
                ParentSource::Root => vec![root_id.clone()],
                ParentSource::Produced(parent) => produced
                    .get(parent)
                    .map(|ids| ids.iter().cloned().collect())
                    .unwrap_or_default(),
            };
            let retain = graph.retains(&edge.child);
            let mut edge_report = EdgeReport::new(edge, parent_ids.len());

            for ids in chunk(&parent_ids, self.limits.max_in_values) {
                let query = child_query(edge, &ids, retain);
                let found = self
                    .store
                    .query(&query)
                    .await
                    .map_err(|source| CascadeError::QueryFailure { phase, source })?;
                edge_report.queries += 1;

                for entity in found {
                    if retain {
                        produced
                            .entry(edge.child.clone())
                            .or_default()
                            .insert(entity.id().clone());
                    }
                    if entity.is_deleted() {
                        edge_report.already_deleted += 1;
                        continue;
                    }
                    edge_report.matched += 1;
                    if enqueued.insert(entity.doc.clone()) {
                        enqueue(entity.doc);
                        edge_report.enqueued += 1;
                    }
                }
            }

            tracing::debug!(
                "Edge #{} {}.{}: {} parents, {} queries, {} live, {} enqueued",
                index,
                edge.child,
                edge.foreign_key,
                edge_report.parent_ids,
                edge_report.queries,
                edge_report.matched,
                edge_report.enqueued
            );
            report.edges.push(edge_report);
        }

        Ok(())
    }
}

/// Query for the children of one chunk of parent ids
///
/// Edges whose output feeds a later edge also read deleted children: a
/// deleted intermediate record may still have live descendants left behind
/// by an interrupted cascade.
fn child_query(edge: &CascadeEdge, parent_ids: &[EntityId], include_deleted: bool) -> Query {
    let filter = match parent_ids {
        [single] => Filter::equals(edge.foreign_key.as_str(), single),
        many => Filter::one_of(
            edge.foreign_key.as_str(),
            many.iter().map(FieldValue::from).collect(),
        ),
    };
    let query = Query::new(edge.child.clone()).filter(filter);
    if include_deleted {
        query
    } else {
        query.live_only()
    }
}
