//! In-memory store backend
//!
//! Behaves like the managed document database the application runs on:
//! - "is one of" filters and write groups are bounded by `StoreLimits`
//! - a write group is applied atomically or not at all
//! - the server timestamp sentinel resolves at commit time
//!
//! Also records every query and committed group size so callers can observe
//! how a workload was split.

use crate::error::StoreError;
use crate::query::Query;
use crate::traits::{ChangeFeed, Store, StoreLimits, WriteGroup};
use crate::types::{CollectionId, DocRef, Document, Entity, EntityId, FieldUpdates};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::watch;

type Collections = HashMap<CollectionId, BTreeMap<EntityId, Document>>;

/// Observed traffic
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Every query served, in order
    pub queries: Vec<Query>,
    /// Operation count of every committed group, in order
    pub committed_groups: Vec<usize>,
}

impl StoreStats {
    /// Queries against one collection
    #[must_use]
    pub fn queries_on(&self, collection: &CollectionId) -> usize {
        self.queries
            .iter()
            .filter(|q| &q.collection == collection)
            .count()
    }

    /// Total operations committed
    #[must_use]
    pub fn writes(&self) -> usize {
        self.committed_groups.iter().sum()
    }
}

/// In-memory document store
#[derive(Debug)]
pub struct MemoryStore {
    limits: StoreLimits,
    collections: RwLock<Collections>,
    stats: Mutex<StoreStats>,
    revision: watch::Sender<u64>,
}

impl MemoryStore {
    /// Create empty store with default limits
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(StoreLimits::default())
    }

    /// Create empty store with custom limits
    #[must_use]
    pub fn with_limits(limits: StoreLimits) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            limits,
            collections: RwLock::new(HashMap::new()),
            stats: Mutex::new(StoreStats::default()),
            revision,
        }
    }

    /// Insert or replace a document directly (seeding)
    pub fn insert(&self, collection: impl Into<CollectionId>, doc: Document) {
        self.collections
            .write()
            .entry(collection.into())
            .or_default()
            .insert(doc.id.clone(), doc);
        self.bump_revision();
    }

    /// Raw document lookup
    #[must_use]
    pub fn document(&self, doc: &DocRef) -> Option<Document> {
        self.collections
            .read()
            .get(&doc.collection)
            .and_then(|c| c.get(&doc.id))
            .cloned()
    }

    /// Typed entity lookup
    ///
    /// # Errors
    /// - `StoreError::Malformed` if the stored document is malformed
    pub fn get(&self, doc: &DocRef) -> Result<Option<Entity>, StoreError> {
        self.document(doc)
            .map(|d| Entity::from_document(&doc.collection, &d))
            .transpose()
    }

    /// Every document in a collection, as entities
    ///
    /// # Errors
    /// - `StoreError::Malformed` if a stored document is malformed
    pub fn entities(&self, collection: &CollectionId) -> Result<Vec<Entity>, StoreError> {
        let guard = self.collections.read();
        guard
            .get(collection)
            .map(|docs| {
                docs.values()
                    .map(|d| Entity::from_document(collection, d))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Snapshot of observed traffic
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.stats.lock().clone()
    }

    /// Forget observed traffic
    pub fn reset_stats(&self) {
        *self.stats.lock() = StoreStats::default();
    }

    /// Current revision (bumped by every seed and commit)
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    fn check_query(&self, query: &Query) -> Result<(), StoreError> {
        let max = self.limits.max_in_values.get();
        for filter in &query.filters {
            if let crate::query::Filter::In { field, values } = filter {
                if values.is_empty() {
                    return Err(StoreError::InvalidQuery(format!(
                        "empty 'is one of' filter on '{field}'"
                    )));
                }
                if values.len() > max {
                    return Err(StoreError::FilterTooLarge {
                        field: field.clone(),
                        len: values.len(),
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    fn apply_group(&self, ops: &[(DocRef, FieldUpdates)]) -> Result<(), StoreError> {
        let max = self.limits.max_group_ops.get();
        if ops.len() > max {
            return Err(StoreError::GroupTooLarge {
                len: ops.len(),
                max,
            });
        }

        let mut guard = self.collections.write();

        // All-or-nothing: validate every target before touching any
        for (doc, _) in ops {
            let exists = guard
                .get(&doc.collection)
                .is_some_and(|c| c.contains_key(&doc.id));
            if !exists {
                return Err(StoreError::NotFound(doc.clone()));
            }
        }

        let at = Utc::now();
        for (doc, updates) in ops {
            if let Some(stored) = guard
                .get_mut(&doc.collection)
                .and_then(|c| c.get_mut(&doc.id))
            {
                stored.apply(updates, at);
            }
        }
        drop(guard);

        self.stats.lock().committed_groups.push(ops.len());
        self.bump_revision();
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    fn limits(&self) -> StoreLimits {
        self.limits
    }

    async fn query(&self, query: &Query) -> Result<Vec<Entity>, StoreError> {
        self.check_query(query)?;
        self.stats.lock().queries.push(query.clone());

        let guard = self.collections.read();
        let Some(docs) = guard.get(&query.collection) else {
            return Ok(Vec::new());
        };

        docs.values()
            .filter(|d| query.matches(d))
            .map(|d| Entity::from_document(&query.collection, d))
            .collect()
    }

    fn write_group(&self) -> Box<dyn WriteGroup + '_> {
        Box::new(MemoryWriteGroup {
            store: self,
            ops: Vec::new(),
        })
    }
}

impl ChangeFeed for MemoryStore {
    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

/// Write group against a `MemoryStore`
struct MemoryWriteGroup<'a> {
    store: &'a MemoryStore,
    ops: Vec<(DocRef, FieldUpdates)>,
}

#[async_trait::async_trait]
impl WriteGroup for MemoryWriteGroup<'_> {
    fn update(&mut self, doc: DocRef, fields: FieldUpdates) {
        self.ops.push((doc, fields));
    }

    fn len(&self) -> usize {
        self.ops.len()
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let ops = std::mem::take(&mut self.ops);
        tracing::trace!("Committing write group of {} operations", ops.len());
        self.store.apply_group(&ops)
    }
}
