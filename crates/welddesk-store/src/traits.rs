//! Store collaborator traits
//!
//! The lifecycle engine only ever talks to a backend through these seams:
//! - `Store` for one-shot queries and write groups
//! - `WriteGroup` for one indivisible, bounded write request
//! - `ChangeFeed` for revision notifications used by live snapshots

use crate::error::StoreError;
use crate::query::Query;
use crate::types::{DocRef, Entity, FieldUpdates, FieldValue};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tokio::sync::watch;

const DEFAULT_MAX_IN_VALUES: NonZeroUsize = match NonZeroUsize::new(30) {
    Some(n) => n,
    None => unreachable!(),
};

const DEFAULT_MAX_GROUP_OPS: NonZeroUsize = match NonZeroUsize::new(500) {
    Some(n) => n,
    None => unreachable!(),
};

/// Documented backend limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLimits {
    /// Maximum values in one "is one of" filter
    pub max_in_values: NonZeroUsize,
    /// Maximum operations in one write group
    pub max_group_ops: NonZeroUsize,
}

impl StoreLimits {
    /// Create limits
    #[inline]
    #[must_use]
    pub fn new(max_in_values: NonZeroUsize, max_group_ops: NonZeroUsize) -> Self {
        Self {
            max_in_values,
            max_group_ops,
        }
    }

    /// With "is one of" limit
    #[inline]
    #[must_use]
    pub fn with_max_in_values(mut self, max: NonZeroUsize) -> Self {
        self.max_in_values = max;
        self
    }

    /// With write group limit
    #[inline]
    #[must_use]
    pub fn with_max_group_ops(mut self, max: NonZeroUsize) -> Self {
        self.max_group_ops = max;
        self
    }

    /// Tightest of two limit sets
    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self {
            max_in_values: self.max_in_values.min(other.max_in_values),
            max_group_ops: self.max_group_ops.min(other.max_group_ops),
        }
    }
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_in_values: DEFAULT_MAX_IN_VALUES,
            max_group_ops: DEFAULT_MAX_GROUP_OPS,
        }
    }
}

/// Document store backend
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Backend limits
    fn limits(&self) -> StoreLimits;

    /// Run a one-shot query
    ///
    /// # Errors
    /// - `StoreError::FilterTooLarge` if an "is one of" filter exceeds the limit
    /// - backend-specific read failures
    async fn query(&self, query: &Query) -> Result<Vec<Entity>, StoreError>;

    /// Start a new, empty write group
    fn write_group(&self) -> Box<dyn WriteGroup + '_>;

    /// Timestamp value resolved by the store at write time
    fn now(&self) -> FieldValue {
        FieldValue::ServerTimestamp
    }
}

/// One indivisible write request
#[async_trait::async_trait]
pub trait WriteGroup: Send {
    /// Queue a field-level update
    fn update(&mut self, doc: DocRef, fields: FieldUpdates);

    /// Queued operations
    fn len(&self) -> usize;

    /// Whether nothing is queued
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every queued update, or none of them
    ///
    /// # Errors
    /// - `StoreError::GroupTooLarge` if the group exceeds the limit
    /// - `StoreError::NotFound` if an update targets a missing document
    async fn commit(&mut self) -> Result<(), StoreError>;
}

/// Revision notifications for live snapshots
pub trait ChangeFeed: Send + Sync {
    /// Receiver that observes every committed revision
    fn subscribe(&self) -> watch::Receiver<u64>;
}

#[async_trait::async_trait]
impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn limits(&self) -> StoreLimits {
        (**self).limits()
    }

    async fn query(&self, query: &Query) -> Result<Vec<Entity>, StoreError> {
        (**self).query(query).await
    }

    fn write_group(&self) -> Box<dyn WriteGroup + '_> {
        (**self).write_group()
    }

    fn now(&self) -> FieldValue {
        (**self).now()
    }
}

impl<S: ChangeFeed + ?Sized> ChangeFeed for std::sync::Arc<S> {
    fn subscribe(&self) -> watch::Receiver<u64> {
        (**self).subscribe()
    }
}
