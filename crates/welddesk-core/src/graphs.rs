//! Cascade graphs per root type
//!
//! Built and validated once when the service starts; a broken graph fails
//! construction rather than a user's delete.

use crate::schema::collections::{
    DOCUMENTS, DOCUMENT_LIBRARIES, DOCUMENT_SECTIONS, MATERIALS, PROJECTS, WELDS, WELD_LOGS,
};
use crate::schema::keys::{LIBRARY_ID, PROJECT_ID, SECTION_ID, WELD_LOG_ID};
use serde::{Deserialize, Serialize};
use std::fmt;
use welddesk_cascade::{CascadeGraph, InvalidGraphError, Schema};

/// Record types that can be deleted with their dependents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RootKind {
    /// Project and everything under it
    Project,
    /// Weld log and its welds
    WeldLog,
    /// Document library, its sections and their documents
    DocumentLibrary,
    /// Document section and its documents
    DocumentSection,
}

impl RootKind {
    /// Every root kind
    pub const ALL: [Self; 4] = [
        Self::Project,
        Self::WeldLog,
        Self::DocumentLibrary,
        Self::DocumentSection,
    ];

    /// Root collection
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Project => PROJECTS,
            Self::WeldLog => WELD_LOGS,
            Self::DocumentLibrary => DOCUMENT_LIBRARIES,
            Self::DocumentSection => DOCUMENT_SECTIONS,
        }
    }

    fn graph(self, schema: &Schema) -> Result<CascadeGraph, InvalidGraphError> {
        let builder = CascadeGraph::builder(self.collection());
        let builder = match self {
            Self::Project => builder
                .edge(WELD_LOGS, PROJECT_ID)
                .edge_from(WELD_LOGS, WELDS, WELD_LOG_ID)
                .edge(MATERIALS, PROJECT_ID)
                .edge(DOCUMENT_LIBRARIES, PROJECT_ID)
                .edge_from(DOCUMENT_LIBRARIES, DOCUMENT_SECTIONS, LIBRARY_ID)
                .edge_from(DOCUMENT_SECTIONS, DOCUMENTS, SECTION_ID),
            Self::WeldLog => builder.edge(WELDS, WELD_LOG_ID),
            Self::DocumentLibrary => builder
                .edge(DOCUMENT_SECTIONS, LIBRARY_ID)
                .edge_from(DOCUMENT_SECTIONS, DOCUMENTS, SECTION_ID),
            Self::DocumentSection => builder.edge(DOCUMENTS, SECTION_ID),
        };
        builder.build(schema)
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// Validated graph for every root kind
#[derive(Debug, Clone)]
pub struct GraphCatalog {
    project: CascadeGraph,
    weld_log: CascadeGraph,
    document_library: CascadeGraph,
    document_section: CascadeGraph,
}

impl GraphCatalog {
    /// Build and validate every graph
    ///
    /// # Errors
    /// - `InvalidGraphError` for the first graph that fails validation
    pub fn new(schema: &Schema) -> Result<Self, InvalidGraphError> {
        let catalog = Self {
            project: RootKind::Project.graph(schema)?,
            weld_log: RootKind::WeldLog.graph(schema)?,
            document_library: RootKind::DocumentLibrary.graph(schema)?,
            document_section: RootKind::DocumentSection.graph(schema)?,
        };
        tracing::debug!("Validated {} cascade graphs", RootKind::ALL.len());
        Ok(catalog)
    }

    /// Graph for a root kind
    #[must_use]
    pub fn get(&self, kind: RootKind) -> &CascadeGraph {
        match kind {
            RootKind::Project => &self.project,
            RootKind::WeldLog => &self.weld_log,
            RootKind::DocumentLibrary => &self.document_library,
            RootKind::DocumentSection => &self.document_section,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::schema::application_schema;
    use welddesk_cascade::ParentSource;

    #[test]
    fn every_application_graph_validates() {
        let catalog = GraphCatalog::new(&application_schema()).unwrap();
        for kind in RootKind::ALL {
            assert_eq!(catalog.get(kind).root().as_str(), kind.collection());
        }
    }

    #[test]
    fn project_graph_reaches_every_collection() {
        let catalog = GraphCatalog::new(&application_schema()).unwrap();
        let graph = catalog.get(RootKind::Project);

        assert_eq!(graph.collections().len(), 7);
        let documents = graph.edges().last().unwrap();
        assert_eq!(documents.child.as_str(), DOCUMENTS);
        assert_eq!(documents.parent, ParentSource::Produced(DOCUMENT_SECTIONS.into()));
    }

    #[test]
    fn weld_log_graph_is_single_edge() {
        let catalog = GraphCatalog::new(&application_schema()).unwrap();
        let graph = catalog.get(RootKind::WeldLog);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].foreign_key, WELD_LOG_ID);
    }

    #[test]
    fn missing_collection_fails_catalog() {
        let schema = Schema::new().collection(PROJECTS, &[]);
        assert!(GraphCatalog::new(&schema).is_err());
    }
}
