//! Welddesk Cascade - soft-delete propagation
//!
//! When a root record (project, weld log, document library, ...) is deleted,
//! every dependent record across independent collections must follow. The
//! backing store offers no multi-collection transaction and bounds both
//! filter sizes and write sizes, so this crate provides:
//! - `chunk`: filter-sized id partitions
//! - `BatchWriter`: bounded, sequential write groups
//! - `CascadeGraph`: declarative parent→child edges per root type
//! - `CascadeDeleteEngine`: one generic traversal over any graph
//!
//! # Example
//!
//! ```rust,ignore
//! use welddesk_cascade::prelude::*;
//!
//! let graph = CascadeGraph::builder("projects")
//!     .edge("weldLogs", "projectId")
//!     .edge_from("weldLogs", "welds", "weldLogId")
//!     .build(&schema)?;
//!
//! let engine = CascadeDeleteEngine::new(store);
//! let report = engine.delete_root(&graph, &project_id, &actor).await?;
//! println!("Deleted {} records", report.planned_writes);
//! ```

#![warn(unreachable_pub)]

pub mod batch;
pub mod chunk;
pub mod engine;
pub mod error;
pub mod graph;

pub use batch::{BatchWriter, CommitSummary};
pub use chunk::{chunk, chunk_count};
pub use engine::{CascadeDeleteEngine, CascadeReport, EdgeReport};
pub use error::{CascadeError, CascadePhase, InvalidGraphError};
pub use graph::{CascadeEdge, CascadeGraph, CascadeGraphBuilder, ParentSource, Schema};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running cascades
    pub use crate::{
        CascadeDeleteEngine, CascadeError, CascadeGraph, CascadeReport, InvalidGraphError, Schema,
    };
}
