//! Welddesk Core - record lifecycle service
//!
//! Ties the store, cascade engine and order allocator to the application:
//! - `schema` / `graphs`: collections and one validated cascade graph per
//!   root type
//! - `LifecycleService`: cascade delete, preview, archive, restore, single
//!   delete, reorder and append order
//! - `AppConfig`: TOML configuration
//! - `telemetry`: tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use welddesk_core::prelude::*;
//!
//! let service = LifecycleService::new(store, &AppConfig::default())?;
//! let session = Session::authenticated(ActorId::new("inspector-1")?);
//! let report = service.delete(&session, RootKind::Project, &project_id).await?;
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod graphs;
pub mod lifecycle;
pub mod schema;
pub mod status;
pub mod telemetry;

pub use config::{AppConfig, LogConfig, LogFormat};
pub use error::{ConfigError, LifecycleError};
pub use graphs::{GraphCatalog, RootKind};
pub use lifecycle::{LifecycleService, MoveOutcome, OrderScope, Session};
pub use schema::application_schema;
pub use status::{validate_transition, TransitionError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for lifecycle operations
    pub use crate::{
        AppConfig, LifecycleError, LifecycleService, OrderScope, RootKind, Session,
    };
    pub use welddesk_order::{MoveDirection, SortDirection};
    pub use welddesk_store::{ActorId, EntityId};
}
