//! Declarative cascade graphs
//!
//! A `CascadeGraph` lists, in dependency order, which collections reference a
//! root type and through which foreign-key field. Multi-level cascades are
//! expressed by edges that consume the ids an earlier edge produced:
//!
//! ```rust,ignore
//! let graph = CascadeGraph::builder("projects")
//!     .edge("weldLogs", "projectId")
//!     .edge_from("weldLogs", "welds", "weldLogId")
//!     .build(&schema)?;
//! ```
//!
//! Graphs are validated against a `Schema` when built, so an unresolvable
//! collection or field fails at construction instead of mid-cascade.

use crate::error::InvalidGraphError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use welddesk_store::CollectionId;

/// Known collections and their fields
#[derive(Debug, Clone, Default)]
pub struct Schema {
    collections: BTreeMap<CollectionId, BTreeSet<String>>,
}

impl Schema {
    /// Empty schema
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a collection and its domain fields
    #[must_use]
    pub fn collection(mut self, name: impl Into<CollectionId>, fields: &[&str]) -> Self {
        self.collections
            .entry(name.into())
            .or_default()
            .extend(fields.iter().map(|f| (*f).to_string()));
        self
    }

    /// Whether the collection is declared
    #[inline]
    #[must_use]
    pub fn contains(&self, collection: &CollectionId) -> bool {
        self.collections.contains_key(collection)
    }

    /// Whether the collection declares the field
    #[inline]
    #[must_use]
    pub fn has_field(&self, collection: &CollectionId, field: &str) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|fields| fields.contains(field))
    }

    /// Declared collections
    pub fn collections(&self) -> impl Iterator<Item = &CollectionId> {
        self.collections.keys()
    }
}

/// Where an edge's parent ids come from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ParentSource {
    /// The root id
    Root,
    /// Every id an earlier edge produced for this collection
    Produced(CollectionId),
}

/// Children in `child` reference their parent through `foreign_key`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CascadeEdge {
    /// Collection holding the dependents
    pub child: CollectionId,
    /// Field on the child holding the parent id
    pub foreign_key: String,
    /// Source of parent ids
    pub parent: ParentSource,
}

/// Validated, ordered cascade description for one root type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeGraph {
    root: CollectionId,
    edges: Vec<CascadeEdge>,
    retained: BTreeSet<CollectionId>,
}

impl CascadeGraph {
    /// Start a graph rooted at `root`
    #[inline]
    #[must_use]
    pub fn builder(root: impl Into<CollectionId>) -> CascadeGraphBuilder {
        CascadeGraphBuilder {
            root: root.into(),
            edges: Vec::new(),
        }
    }

    /// Root collection
    #[inline]
    #[must_use]
    pub fn root(&self) -> &CollectionId {
        &self.root
    }

    /// Edges in declaration (processing) order
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[CascadeEdge] {
        &self.edges
    }

    /// Whether a later edge consumes ids produced for `collection`
    #[inline]
    #[must_use]
    pub fn retains(&self, collection: &CollectionId) -> bool {
        self.retained.contains(collection)
    }

    /// Collections the cascade can write to, root included
    #[must_use]
    pub fn collections(&self) -> BTreeSet<&CollectionId> {
        std::iter::once(&self.root)
            .chain(self.edges.iter().map(|e| &e.child))
            .collect()
    }
}

/// Builder for `CascadeGraph`
#[derive(Debug, Clone)]
pub struct CascadeGraphBuilder {
    root: CollectionId,
    edges: Vec<CascadeEdge>,
}

impl CascadeGraphBuilder {
    /// Children of the root itself
    #[must_use]
    pub fn edge(mut self, child: impl Into<CollectionId>, foreign_key: impl Into<String>) -> Self {
        self.edges.push(CascadeEdge {
            child: child.into(),
            foreign_key: foreign_key.into(),
            parent: ParentSource::Root,
        });
        self
    }

    /// Children of records an earlier edge produced
    #[must_use]
    pub fn edge_from(
        mut self,
        parent: impl Into<CollectionId>,
        child: impl Into<CollectionId>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.edges.push(CascadeEdge {
            child: child.into(),
            foreign_key: foreign_key.into(),
            parent: ParentSource::Produced(parent.into()),
        });
        self
    }

    /// Validate against `schema`
    ///
    /// # Errors
    /// - `InvalidGraphError::UnknownCollection` for an undeclared root or child
    /// - `InvalidGraphError::EmptyForeignKey` / `UnknownField` for a bad key
    /// - `InvalidGraphError::ParentNotProduced` when an edge consumes ids no
    ///   earlier edge produces
    /// - `InvalidGraphError::DuplicateEdge` for a repeated edge
    /// - `InvalidGraphError::ProducedAfterConsumer` when an edge produces ids
    ///   for a collection whose consumer already ran
    pub fn build(self, schema: &Schema) -> Result<CascadeGraph, InvalidGraphError> {
        if !schema.contains(&self.root) {
            return Err(InvalidGraphError::UnknownCollection(self.root));
        }

        let mut produced: BTreeSet<&CollectionId> = BTreeSet::new();
        // Consumers see only ids produced before them
        let mut retained = BTreeSet::new();

        for (index, edge) in self.edges.iter().enumerate() {
            if !schema.contains(&edge.child) {
                return Err(InvalidGraphError::UnknownCollection(edge.child.clone()));
            }
            if edge.foreign_key.trim().is_empty() {
                return Err(InvalidGraphError::EmptyForeignKey {
                    edge: index,
                    collection: edge.child.clone(),
                });
            }
            if !schema.has_field(&edge.child, &edge.foreign_key) {
                return Err(InvalidGraphError::UnknownField {
                    collection: edge.child.clone(),
                    field: edge.foreign_key.clone(),
                });
            }
            if let ParentSource::Produced(parent) = &edge.parent {
                if !produced.contains(parent) {
                    return Err(InvalidGraphError::ParentNotProduced {
                        edge: index,
                        parent: parent.clone(),
                    });
                }
                retained.insert(parent.clone());
            }
            if retained.contains(&edge.child) {
                return Err(InvalidGraphError::ProducedAfterConsumer {
                    edge: index,
                    collection: edge.child.clone(),
                });
            }
            if self.edges[..index].contains(edge) {
                return Err(InvalidGraphError::DuplicateEdge { edge: index });
            }
            produced.insert(&edge.child);
        }

        Ok(CascadeGraph {
            root: self.root,
            edges: self.edges,
            retained,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::new()
            .collection("projects", &[])
            .collection("weldLogs", &["projectId", "ownerId"])
            .collection("welds", &["weldLogId", "projectId"])
    }

    #[test]
    fn builds_two_level_graph() {
        let graph = CascadeGraph::builder("projects")
            .edge("weldLogs", "projectId")
            .edge_from("weldLogs", "welds", "weldLogId")
            .build(&schema())
            .unwrap();

        assert_eq!(graph.edges().len(), 2);
        assert!(graph.retains(&"weldLogs".into()));
        assert!(!graph.retains(&"welds".into()));
        assert_eq!(graph.collections().len(), 3);
    }

    #[test]
    fn rejects_unknown_root() {
        let err = CascadeGraph::builder("sites").build(&schema()).unwrap_err();
        assert_eq!(err, InvalidGraphError::UnknownCollection("sites".into()));
    }

    #[test]
    fn rejects_unknown_field() {
        let err = CascadeGraph::builder("projects")
            .edge("weldLogs", "projectUid")
            .build(&schema())
            .unwrap_err();
        assert!(matches!(err, InvalidGraphError::UnknownField { .. }));
    }

    #[test]
    fn rejects_empty_foreign_key() {
        let err = CascadeGraph::builder("projects")
            .edge("weldLogs", " ")
            .build(&schema())
            .unwrap_err();
        assert!(matches!(err, InvalidGraphError::EmptyForeignKey { edge: 0, .. }));
    }

    #[test]
    fn rejects_consumer_declared_before_producer() {
        let err = CascadeGraph::builder("projects")
            .edge_from("weldLogs", "welds", "weldLogId")
            .edge("weldLogs", "projectId")
            .build(&schema())
            .unwrap_err();
        assert_eq!(
            err,
            InvalidGraphError::ParentNotProduced {
                edge: 0,
                parent: "weldLogs".into()
            }
        );
    }

    #[test]
    fn rejects_duplicate_edge() {
        let err = CascadeGraph::builder("projects")
            .edge("weldLogs", "projectId")
            .edge("weldLogs", "projectId")
            .build(&schema())
            .unwrap_err();
        assert_eq!(err, InvalidGraphError::DuplicateEdge { edge: 1 });
    }

    #[test]
    fn rejects_producer_declared_after_its_consumer() {
        // weldLogs reached through ownerId would never have their welds read
        let err = CascadeGraph::builder("projects")
            .edge("weldLogs", "projectId")
            .edge_from("weldLogs", "welds", "weldLogId")
            .edge("weldLogs", "ownerId")
            .build(&schema())
            .unwrap_err();
        assert_eq!(
            err,
            InvalidGraphError::ProducedAfterConsumer {
                edge: 2,
                collection: "weldLogs".into()
            }
        );
    }

    #[test]
    fn every_producer_before_consumer_is_allowed() {
        let graph = CascadeGraph::builder("projects")
            .edge("weldLogs", "projectId")
            .edge("weldLogs", "ownerId")
            .edge_from("weldLogs", "welds", "weldLogId")
            .build(&schema())
            .unwrap();
        assert_eq!(graph.edges().len(), 3);
    }

    #[test]
    fn rejects_edge_consuming_its_own_output() {
        let err = CascadeGraph::builder("projects")
            .edge("weldLogs", "projectId")
            .edge_from("weldLogs", "weldLogs", "ownerId")
            .build(&schema())
            .unwrap_err();
        assert!(matches!(err, InvalidGraphError::ProducedAfterConsumer { edge: 1, .. }));
    }

    #[test]
    fn same_child_through_different_keys_is_allowed() {
        let graph = CascadeGraph::builder("projects")
            .edge("weldLogs", "projectId")
            .edge("welds", "projectId")
            .edge_from("weldLogs", "welds", "weldLogId")
            .build(&schema())
            .unwrap();
        assert_eq!(graph.edges().len(), 3);
    }
}
