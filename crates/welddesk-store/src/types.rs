//! Core types for the document store boundary
//!
//! Defines:
//! - Identifiers (entities, actors, collections, document references)
//! - Lifecycle status
//! - Field values and partial field updates
//! - Stored documents and their typed entity view

use crate::error::{IdError, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Persisted field names shared by every entity
pub mod fields {
    /// Pseudo-field addressing the document id in filters
    pub const ID: &str = "id";
    /// Lifecycle status
    pub const STATUS: &str = "status";
    /// Creation timestamp
    pub const CREATED_AT: &str = "createdAt";
    /// Last update timestamp
    pub const UPDATED_AT: &str = "updatedAt";
    /// Deletion timestamp
    pub const DELETED_AT: &str = "deletedAt";
    /// Creating actor
    pub const CREATED_BY: &str = "createdBy";
    /// Last updating actor
    pub const UPDATED_BY: &str = "updatedBy";
    /// Deleting actor
    pub const DELETED_BY: &str = "deletedBy";
    /// Sparse sibling position
    pub const ORDER: &str = "order";

    /// Fields owned by the lifecycle layer rather than the domain
    pub const SYSTEM: [&str; 8] = [
        STATUS, CREATED_AT, UPDATED_AT, DELETED_AT, CREATED_BY, UPDATED_BY, DELETED_BY, ID,
    ];
}

/// Document identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing id
    ///
    /// # Errors
    /// - `IdError::Empty` if the id is empty or whitespace
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdError::Empty("entity"));
        }
        Ok(Self(id))
    }

    /// Generate a fresh, sortable id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Authenticated actor performing a write
///
/// Never empty: holding an `ActorId` means a user is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Wrap an actor id
    ///
    /// # Errors
    /// - `IdError::Empty` if the id is empty or whitespace
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdError::Empty("actor"));
        }
        Ok(Self(id))
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collection name (e.g. `weldLogs`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    /// Create collection id
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reference a document in this collection
    #[inline]
    #[must_use]
    pub fn doc(&self, id: &EntityId) -> DocRef {
        DocRef::new(self.clone(), id.clone())
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reference to a single document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocRef {
    /// Owning collection
    pub collection: CollectionId,
    /// Document id
    pub id: EntityId,
}

impl DocRef {
    /// Create reference
    #[inline]
    #[must_use]
    pub fn new(collection: CollectionId, id: EntityId) -> Self {
        Self { collection, id }
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Entity lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    /// Visible and editable
    #[default]
    Active,
    /// Hidden from default views, restorable
    Archived,
    /// Soft deleted, terminal
    Deleted,
}

impl EntityStatus {
    /// Persisted name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// A single persisted field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer (used for `order`)
    Int(i64),
    /// Text, including foreign keys
    Text(String),
    /// Lifecycle status
    Status(EntityStatus),
    /// Resolved timestamp
    Time(DateTime<Utc>),
    /// Timestamp assigned by the store when the write is applied
    ServerTimestamp,
}

impl FieldValue {
    /// Text content, if this is a text value
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this is an integer value
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&EntityId> for FieldValue {
    fn from(value: &EntityId) -> Self {
        Self::Text(value.as_str().to_string())
    }
}

impl From<&ActorId> for FieldValue {
    fn from(value: &ActorId) -> Self {
        Self::Text(value.as_str().to_string())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<EntityStatus> for FieldValue {
    fn from(value: EntityStatus) -> Self {
        Self::Status(value)
    }
}

/// Partial, field-level update of one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdates {
    fields: BTreeMap<String, FieldValue>,
}

impl FieldUpdates {
    /// Empty update
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field
    #[inline]
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Lifecycle transition with audit fields
    ///
    /// Always stamps `updatedAt`/`updatedBy`; a transition to `Deleted`
    /// also stamps `deletedAt`/`deletedBy`.
    #[must_use]
    pub fn status_change(status: EntityStatus, actor: &ActorId, now: FieldValue) -> Self {
        let updates = Self::new()
            .set(fields::STATUS, status)
            .set(fields::UPDATED_AT, now.clone())
            .set(fields::UPDATED_BY, actor);

        if status == EntityStatus::Deleted {
            updates
                .set(fields::DELETED_AT, now)
                .set(fields::DELETED_BY, actor)
        } else {
            updates
        }
    }

    /// Field lookup
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Iterate fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Raw stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: EntityId,
    /// All persisted fields
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Empty document
    #[inline]
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    /// Freshly created active document with creation audit fields
    #[must_use]
    pub fn created(id: EntityId, actor: &ActorId, at: DateTime<Utc>) -> Self {
        Self::new(id)
            .with(fields::STATUS, EntityStatus::Active)
            .with(fields::CREATED_AT, FieldValue::Time(at))
            .with(fields::UPDATED_AT, FieldValue::Time(at))
            .with(fields::CREATED_BY, actor)
            .with(fields::UPDATED_BY, actor)
    }

    /// Set a field
    #[inline]
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Field lookup; `id` resolves to the document id
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        if name == fields::ID {
            return Some(FieldValue::from(&self.id));
        }
        self.fields.get(name).cloned()
    }

    /// Lifecycle status (documents without one are active)
    #[must_use]
    pub fn status(&self) -> EntityStatus {
        match self.fields.get(fields::STATUS) {
            Some(FieldValue::Status(s)) => *s,
            Some(FieldValue::Text(s)) => s.parse().unwrap_or_default(),
            _ => EntityStatus::Active,
        }
    }

    /// Merge a partial update, resolving the server timestamp to `at`
    pub fn apply(&mut self, updates: &FieldUpdates, at: DateTime<Utc>) {
        for (name, value) in updates.iter() {
            let value = match value {
                FieldValue::ServerTimestamp => FieldValue::Time(at),
                other => other.clone(),
            };
            self.fields.insert(name.to_string(), value);
        }
    }
}

/// Typed view of a stored document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Document reference
    pub doc: DocRef,
    /// Lifecycle status
    pub status: EntityStatus,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    pub updated_at: Option<DateTime<Utc>>,
    /// Deletion time
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creating actor
    pub created_by: Option<String>,
    /// Last updating actor
    pub updated_by: Option<String>,
    /// Deleting actor
    pub deleted_by: Option<String>,
    /// Domain fields (foreign keys, `order`, payload)
    pub fields: BTreeMap<String, FieldValue>,
}

impl Entity {
    /// Build the typed view of a document
    ///
    /// # Errors
    /// - `StoreError::Malformed` if a system field has the wrong type
    pub fn from_document(collection: &CollectionId, doc: &Document) -> Result<Self, StoreError> {
        let doc_ref = collection.doc(&doc.id);

        let time = |name: &str| -> Result<Option<DateTime<Utc>>, StoreError> {
            match doc.fields.get(name) {
                None | Some(FieldValue::Null) => Ok(None),
                Some(FieldValue::Time(t)) => Ok(Some(*t)),
                Some(other) => Err(StoreError::malformed(
                    &doc_ref,
                    format!("{name} is not a timestamp: {other:?}"),
                )),
            }
        };
        let text = |name: &str| -> Result<Option<String>, StoreError> {
            match doc.fields.get(name) {
                None | Some(FieldValue::Null) => Ok(None),
                Some(FieldValue::Text(s)) => Ok(Some(s.clone())),
                Some(other) => Err(StoreError::malformed(
                    &doc_ref,
                    format!("{name} is not text: {other:?}"),
                )),
            }
        };

        let status = match doc.fields.get(fields::STATUS) {
            None | Some(FieldValue::Null) => EntityStatus::Active,
            Some(FieldValue::Status(s)) => *s,
            Some(FieldValue::Text(s)) => s
                .parse()
                .map_err(|reason: String| StoreError::malformed(&doc_ref, reason))?,
            Some(other) => {
                return Err(StoreError::malformed(
                    &doc_ref,
                    format!("status has wrong type: {other:?}"),
                ))
            }
        };

        let domain = doc
            .fields
            .iter()
            .filter(|(name, _)| !fields::SYSTEM.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(Self {
            status,
            created_at: time(fields::CREATED_AT)?,
            updated_at: time(fields::UPDATED_AT)?,
            deleted_at: time(fields::DELETED_AT)?,
            created_by: text(fields::CREATED_BY)?,
            updated_by: text(fields::UPDATED_BY)?,
            deleted_by: text(fields::DELETED_BY)?,
            fields: domain,
            doc: doc_ref,
        })
    }

    /// Entity id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.doc.id
    }

    /// Text domain field (foreign keys)
    #[inline]
    #[must_use]
    pub fn field_text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    /// Sparse sibling position, if the entity is orderable
    #[inline]
    #[must_use]
    pub fn order(&self) -> Option<i64> {
        self.fields.get(fields::ORDER).and_then(FieldValue::as_int)
    }

    /// Whether the entity is soft deleted
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status == EntityStatus::Deleted
    }
}
