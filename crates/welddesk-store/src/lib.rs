//! Welddesk Store - document database boundary
//!
//! Everything the lifecycle engine needs from a backend:
//! - Entities, lifecycle status and field-level updates
//! - One-shot queries with equality and "is one of" filters
//! - Bounded, indivisible write groups
//! - An in-memory backend honouring the same limits
//! - Live snapshot streams for views
//!
//! # Example
//!
//! ```rust,ignore
//! use welddesk_store::prelude::*;
//!
//! let store = MemoryStore::new();
//! let query = Query::new("welds".into())
//!     .filter(Filter::equals("weldLogId", "log-1"))
//!     .live_only();
//! let welds = store.query(&query).await?;
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod live;
pub mod memory;
pub mod query;
pub mod traits;
pub mod types;

pub use error::{IdError, StoreError};
pub use memory::{MemoryStore, StoreStats};
pub use query::{Filter, Query};
pub use traits::{ChangeFeed, Store, StoreLimits, WriteGroup};
pub use types::{
    fields, ActorId, CollectionId, DocRef, Document, Entity, EntityId, EntityStatus, FieldUpdates,
    FieldValue,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the store boundary
    pub use crate::{
        ActorId, CollectionId, DocRef, Document, Entity, EntityId, EntityStatus, FieldUpdates,
        FieldValue, Filter, MemoryStore, Query, Store, StoreLimits, WriteGroup,
    };
}
