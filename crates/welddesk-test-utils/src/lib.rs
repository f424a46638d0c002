//! Testing utilities for the welddesk workspace
//!
//! Shared fixtures and a fault-injecting store wrapper.

#![allow(missing_docs)]

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use welddesk_store::{
    fields, ActorId, CollectionId, DocRef, Document, Entity, EntityId, EntityStatus,
    FieldUpdates, FieldValue, MemoryStore, Query, Store, StoreError, StoreLimits, WriteGroup,
};

pub fn id(s: &str) -> EntityId {
    EntityId::new(s).unwrap()
}

pub fn actor() -> ActorId {
    ActorId::new("inspector-1").unwrap()
}

pub fn doc_ref(collection: &str, entity: &str) -> DocRef {
    DocRef::new(collection.into(), id(entity))
}

/// Seed an active record with audit fields and the given domain fields
pub fn seed(store: &MemoryStore, collection: &str, entity: &str, domain: &[(&str, &str)]) {
    let mut doc = Document::created(id(entity), &actor(), Utc::now());
    for (field, value) in domain {
        doc = doc.with(*field, *value);
    }
    store.insert(collection, doc);
}

/// Seed a record that an earlier cascade already deleted
pub fn seed_deleted(store: &MemoryStore, collection: &str, entity: &str, domain: &[(&str, &str)]) {
    seed(store, collection, entity, domain);
    let at = Utc::now();
    let mut doc = store.document(&doc_ref(collection, entity)).unwrap();
    doc.apply(
        &FieldUpdates::status_change(EntityStatus::Deleted, &actor(), FieldValue::Time(at)),
        at,
    );
    store.insert(collection, doc);
}

/// Seed an active record carrying an `order` key
pub fn seed_ordered(
    store: &MemoryStore,
    collection: &str,
    entity: &str,
    order: i64,
    domain: &[(&str, &str)],
) {
    seed(store, collection, entity, domain);
    let mut doc = store.document(&doc_ref(collection, entity)).unwrap();
    doc.fields.insert(fields::ORDER.to_string(), FieldValue::Int(order));
    store.insert(collection, doc);
}

pub fn status_of(store: &MemoryStore, collection: &str, entity: &str) -> EntityStatus {
    store.get(&doc_ref(collection, entity)).unwrap().unwrap().status
}

pub fn entity(store: &MemoryStore, collection: &str, entity: &str) -> Entity {
    store.get(&doc_ref(collection, entity)).unwrap().unwrap()
}

/// Records in `collection` with the given status
pub fn count_with_status(store: &MemoryStore, collection: &str, status: EntityStatus) -> usize {
    store
        .entities(&collection.into())
        .unwrap()
        .iter()
        .filter(|e| e.status == status)
        .count()
}

/// Project → weld logs → welds tree with `logs` logs of `welds_per_log` welds
pub fn seed_project_tree(store: &MemoryStore, project: &str, logs: usize, welds_per_log: usize) {
    seed(store, "projects", project, &[]);
    for l in 0..logs {
        let log = format!("{project}-log{l}");
        seed(store, "weldLogs", &log, &[("projectId", project)]);
        for w in 0..welds_per_log {
            let weld = format!("{log}-w{w}");
            seed(store, "welds", &weld, &[("weldLogId", log.as_str()), ("projectId", project)]);
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    query_collection: Option<CollectionId>,
    query_nth: Option<usize>,
    commit_nth: Option<usize>,
    queries_seen: usize,
    commits_seen: usize,
}

/// Store wrapper that fails selected reads or write groups
///
/// Counters are one-based and count every call, failed or not.
#[derive(Debug, Clone)]
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    faults: Arc<Mutex<Faults>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            faults: Arc::new(Mutex::new(Faults::default())),
        }
    }

    pub fn inner(&self) -> &Arc<MemoryStore> {
        &self.inner
    }

    /// Fail every query against `collection`
    pub fn fail_queries_on(self, collection: &str) -> Self {
        self.faults.lock().query_collection = Some(collection.into());
        self
    }

    /// Fail the `n`th query
    pub fn fail_nth_query(self, n: usize) -> Self {
        self.faults.lock().query_nth = Some(n);
        self
    }

    /// Fail the `n`th write group commit
    pub fn fail_nth_commit(self, n: usize) -> Self {
        self.faults.lock().commit_nth = Some(n);
        self
    }

    /// Stop injecting faults
    pub fn heal(&self) {
        let mut faults = self.faults.lock();
        faults.query_collection = None;
        faults.query_nth = None;
        faults.commit_nth = None;
    }
}

#[async_trait::async_trait]
impl Store for FaultyStore {
    fn limits(&self) -> StoreLimits {
        self.inner.limits()
    }

    async fn query(&self, query: &Query) -> Result<Vec<Entity>, StoreError> {
        let fail = {
            let mut faults = self.faults.lock();
            faults.queries_seen += 1;
            faults.query_nth == Some(faults.queries_seen)
                || faults.query_collection.as_ref() == Some(&query.collection)
        };
        if fail {
            return Err(StoreError::Unavailable(format!(
                "injected read failure on {}",
                query.collection
            )));
        }
        self.inner.query(query).await
    }

    fn write_group(&self) -> Box<dyn WriteGroup + '_> {
        Box::new(FaultyGroup {
            inner: self.inner.write_group(),
            faults: &self.faults,
        })
    }

    fn now(&self) -> FieldValue {
        self.inner.now()
    }
}

struct FaultyGroup<'a> {
    inner: Box<dyn WriteGroup + 'a>,
    faults: &'a Mutex<Faults>,
}

#[async_trait::async_trait]
impl WriteGroup for FaultyGroup<'_> {
    fn update(&mut self, doc: DocRef, fields: FieldUpdates) {
        self.inner.update(doc, fields);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let fail = {
            let mut faults = self.faults.lock();
            faults.commits_seen += 1;
            faults.commit_nth == Some(faults.commits_seen)
        };
        if fail {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        self.inner.commit().await
    }
}
