//! Lifecycle service
//!
//! Entry point for user-initiated lifecycle actions. Every mutating operation
//! requires an authenticated actor and fails with `AuthRequired` before any
//! read or write when there is none.

use crate::config::AppConfig;
use crate::error::LifecycleError;
use crate::graphs::{GraphCatalog, RootKind};
use crate::schema::{application_schema, collections, keys};
use crate::status::validate_transition;
use serde::Serialize;
use std::sync::Arc;
use welddesk_cascade::{BatchWriter, CascadeDeleteEngine, CascadeReport};
use welddesk_order::{move_target, MoveDirection, MovePlan, OrderAllocator, SortDirection};
use welddesk_store::{
    fields, ActorId, CollectionId, Entity, EntityId, EntityStatus, FieldUpdates, Filter, Query,
    Store,
};

/// Caller identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    actor: Option<ActorId>,
}

impl Session {
    /// No signed-in user
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed-in user
    #[inline]
    #[must_use]
    pub fn authenticated(actor: ActorId) -> Self {
        Self { actor: Some(actor) }
    }

    /// Session for an optional user id; an empty id is anonymous
    #[must_use]
    pub fn from_user(user: Option<&str>) -> Self {
        Self {
            actor: user.and_then(|u| ActorId::new(u).ok()),
        }
    }

    /// Authenticated actor
    ///
    /// # Errors
    /// - `LifecycleError::AuthRequired` for an anonymous session
    pub fn actor(&self) -> Result<&ActorId, LifecycleError> {
        self.actor.as_ref().ok_or(LifecycleError::AuthRequired)
    }
}

/// Siblings sharing one parent, ordered by `order`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderScope {
    /// Collection holding the siblings
    pub collection: CollectionId,
    /// Foreign key to the parent
    pub parent_field: String,
    /// Parent id
    pub parent_id: EntityId,
    /// Read direction of the list
    pub direction: SortDirection,
}

impl OrderScope {
    /// Ascending scope
    #[must_use]
    pub fn new(
        collection: impl Into<CollectionId>,
        parent_field: impl Into<String>,
        parent_id: EntityId,
    ) -> Self {
        Self {
            collection: collection.into(),
            parent_field: parent_field.into(),
            parent_id,
            direction: SortDirection::Ascending,
        }
    }

    /// Sections of a document library
    #[must_use]
    pub fn document_sections(library_id: EntityId) -> Self {
        Self::new(collections::DOCUMENT_SECTIONS, keys::LIBRARY_ID, library_id)
    }

    /// Documents of a section
    #[must_use]
    pub fn documents(section_id: EntityId) -> Self {
        Self::new(collections::DOCUMENTS, keys::SECTION_ID, section_id)
    }

    /// With read direction
    #[inline]
    #[must_use]
    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    fn query(&self) -> Query {
        Query::new(self.collection.clone())
            .filter(Filter::equals(self.parent_field.as_str(), &self.parent_id))
            .live_only()
    }

    /// Sort in read order; records without a key go last, ties by id
    fn sort(&self, siblings: &mut [Entity]) {
        match self.direction {
            SortDirection::Ascending => siblings.sort_by(|a, b| {
                (a.order().unwrap_or(i64::MAX), a.id()).cmp(&(b.order().unwrap_or(i64::MAX), b.id()))
            }),
            SortDirection::Descending => siblings.sort_by(|a, b| {
                (b.order().unwrap_or(i64::MIN), a.id()).cmp(&(a.order().unwrap_or(i64::MIN), b.id()))
            }),
        }
    }
}

/// Outcome of a reorder request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    /// Whether the list changed (false at a boundary)
    pub moved: bool,
    /// Records written
    pub writes: usize,
    /// Whether every sibling had to be renumbered
    pub renumbered: bool,
}

/// Lifecycle operations over one store
#[derive(Debug)]
pub struct LifecycleService<S: ?Sized> {
    store: Arc<S>,
    engine: CascadeDeleteEngine<S>,
    catalog: GraphCatalog,
    allocator: OrderAllocator,
}

impl<S: Store + ?Sized> LifecycleService<S> {
    /// Create service and validate every cascade graph
    ///
    /// # Errors
    /// - `LifecycleError::Graph` if an application graph is invalid
    pub fn new(store: Arc<S>, config: &AppConfig) -> Result<Self, LifecycleError> {
        let catalog = GraphCatalog::new(&application_schema())?;
        let engine = CascadeDeleteEngine::new(Arc::clone(&store)).with_limits(config.store);
        Ok(Self {
            store,
            engine,
            catalog,
            allocator: OrderAllocator::new(config.ordering),
        })
    }

    /// Validated graphs
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &GraphCatalog {
        &self.catalog
    }

    /// Order key allocator
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &OrderAllocator {
        &self.allocator
    }

    /// Cascade-delete a root record and all its dependents
    ///
    /// # Errors
    /// - `LifecycleError::AuthRequired` without an actor
    /// - `LifecycleError::Cascade` if selection or a write group fails; a
    ///   retry completes the job
    pub async fn delete(
        &self,
        session: &Session,
        kind: RootKind,
        root_id: &EntityId,
    ) -> Result<CascadeReport, LifecycleError> {
        let actor = session.actor()?;
        let report = self
            .engine
            .delete_root(self.catalog.get(kind), root_id, actor)
            .await?;
        Ok(report)
    }

    /// Report what `delete` would write, without writing
    ///
    /// # Errors
    /// - `LifecycleError::AuthRequired` without an actor
    /// - `LifecycleError::Cascade` if a read fails or the root is missing
    pub async fn preview_delete(
        &self,
        session: &Session,
        kind: RootKind,
        root_id: &EntityId,
    ) -> Result<CascadeReport, LifecycleError> {
        session.actor()?;
        let report = self.engine.preview(self.catalog.get(kind), root_id).await?;
        Ok(report)
    }

    /// Archive one record; returns whether anything was written
    ///
    /// # Errors
    /// - `LifecycleError::AuthRequired` without an actor
    /// - `LifecycleError::NotFound` if the record does not exist
    /// - `LifecycleError::Transition` if the record is deleted
    pub async fn archive(
        &self,
        session: &Session,
        collection: &CollectionId,
        id: &EntityId,
    ) -> Result<bool, LifecycleError> {
        self.change_status(session, collection, id, EntityStatus::Archived)
            .await
    }

    /// Return an archived record to active
    ///
    /// # Errors
    /// - `LifecycleError::AuthRequired` without an actor
    /// - `LifecycleError::NotFound` if the record does not exist
    /// - `LifecycleError::Transition` if the record is deleted
    pub async fn restore(
        &self,
        session: &Session,
        collection: &CollectionId,
        id: &EntityId,
    ) -> Result<bool, LifecycleError> {
        self.change_status(session, collection, id, EntityStatus::Active)
            .await
    }

    /// Soft-delete one record without touching its dependents
    ///
    /// For leaf records (welds, materials, documents) that no graph roots at.
    ///
    /// # Errors
    /// - `LifecycleError::AuthRequired` without an actor
    /// - `LifecycleError::CascadeRequired` for a collection a graph roots at
    /// - `LifecycleError::NotFound` if the record does not exist
    pub async fn delete_single(
        &self,
        session: &Session,
        collection: &CollectionId,
        id: &EntityId,
    ) -> Result<bool, LifecycleError> {
        session.actor()?;
        if RootKind::ALL
            .iter()
            .any(|kind| kind.collection() == collection.as_str())
        {
            return Err(LifecycleError::CascadeRequired(collection.clone()));
        }
        self.change_status(session, collection, id, EntityStatus::Deleted)
            .await
    }

    async fn change_status(
        &self,
        session: &Session,
        collection: &CollectionId,
        id: &EntityId,
        to: EntityStatus,
    ) -> Result<bool, LifecycleError> {
        let actor = session.actor()?;
        let query = Query::new(collection.clone()).filter(Filter::equals(fields::ID, id));
        let current = self
            .store
            .query(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LifecycleError::NotFound(collection.doc(id)))?;

        validate_transition(current.status, to)?;
        if current.status == to {
            tracing::debug!("{} already {}", current.doc, to);
            return Ok(false);
        }

        let mut group = self.store.write_group();
        group.update(
            current.doc.clone(),
            FieldUpdates::status_change(to, actor, self.store.now()),
        );
        group.commit().await?;
        tracing::info!("{} {} -> {} by {}", current.doc, current.status, to, actor);
        Ok(true)
    }

    /// Move one item a single step within its scope
    ///
    /// Writes only the moved item and the displaced neighbour unless their
    /// keys cannot express the new order, in which case the scope is
    /// renumbered.
    ///
    /// # Errors
    /// - `LifecycleError::AuthRequired` without an actor
    /// - `LifecycleError::NotFound` if the item is not a live member of the scope
    /// - `LifecycleError::Cascade` if a write group fails
    pub async fn move_item(
        &self,
        session: &Session,
        scope: &OrderScope,
        item_id: &EntityId,
        direction: MoveDirection,
    ) -> Result<MoveOutcome, LifecycleError> {
        let actor = session.actor()?;
        let mut siblings = self.store.query(&scope.query()).await?;
        scope.sort(&mut siblings);

        if !siblings.iter().any(|e| e.id() == item_id) {
            return Err(LifecycleError::NotFound(scope.collection.doc(item_id)));
        }
        let Some((from, to)) = move_target(&siblings, item_id, direction, Entity::id) else {
            return Ok(MoveOutcome::default());
        };

        let plan = match siblings.iter().map(Entity::order).collect::<Option<Vec<i64>>>() {
            Some(orders) => self.allocator.plan_move(&orders, from, to, scope.direction),
            None => {
                tracing::debug!("Scope {} has unkeyed items, renumbering", scope.collection);
                let mut current: Vec<Option<i64>> = siblings.iter().map(Entity::order).collect();
                current.swap(from, to);
                let fresh = self
                    .allocator
                    .order_values_for_batch(siblings.len(), scope.direction);
                MovePlan {
                    changes: fresh
                        .into_iter()
                        .enumerate()
                        .filter(|(i, key)| current[*i] != Some(*key))
                        .collect(),
                    renumbered: true,
                }
            }
        };
        siblings.swap(from, to);

        let now = self.store.now();
        let limit = self.engine.limits().max_group_ops;
        let mut writer = BatchWriter::with_max_ops(&*self.store, limit);
        for (position, key) in &plan.changes {
            let updates = FieldUpdates::new()
                .set(fields::ORDER, *key)
                .set(fields::UPDATED_AT, now.clone())
                .set(fields::UPDATED_BY, actor);
            writer.add(siblings[*position].doc.clone(), updates);
        }
        let summary = writer.commit().await?;

        tracing::info!(
            "Moved {} {:?} in {}: {} records written",
            item_id,
            direction,
            scope.collection,
            summary.operations
        );
        Ok(MoveOutcome {
            moved: true,
            writes: summary.operations,
            renumbered: plan.renumbered,
        })
    }

    /// Order key for an item appended to `scope`
    ///
    /// # Errors
    /// - `LifecycleError::Store` if the sibling read fails
    pub async fn next_order(&self, scope: &OrderScope) -> Result<i64, LifecycleError> {
        let siblings = self.store.query(&scope.query()).await?;
        let highest = siblings.iter().filter_map(Entity::order).max();
        if highest.is_none() && !siblings.is_empty() {
            return Ok(self.allocator.fallback_order());
        }
        Ok(self.allocator.next_order(highest))
    }
}

impl From<&ActorId> for Session {
    fn from(actor: &ActorId) -> Self {
        Self::authenticated(actor.clone())
    }
}
