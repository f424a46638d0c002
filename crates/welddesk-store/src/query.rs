//! One-shot query description

use crate::types::{CollectionId, Document, EntityStatus, FieldValue};
use serde::{Deserialize, Serialize};

/// A single field predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Field equals value
    Eq {
        /// Field name (`id` addresses the document id)
        field: String,
        /// Expected value
        value: FieldValue,
    },
    /// Field is one of the values
    In {
        /// Field name (`id` addresses the document id)
        field: String,
        /// Accepted values
        values: Vec<FieldValue>,
    },
}

impl Filter {
    /// Equality filter
    #[inline]
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// "Is one of" filter
    #[inline]
    pub fn one_of(field: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    /// Filtered field
    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. } | Self::In { field, .. } => field,
        }
    }

    /// Whether a document satisfies the predicate
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.field(self.field()) else {
            return false;
        };
        match self {
            Self::Eq { value, .. } => actual == *value,
            Self::In { values, .. } => values.contains(&actual),
        }
    }
}

/// Query over one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Target collection
    pub collection: CollectionId,
    /// Conjunction of predicates
    pub filters: Vec<Filter>,
    /// Status to leave out of the result
    pub exclude_status: Option<EntityStatus>,
}

impl Query {
    /// Query every document of a collection
    #[inline]
    #[must_use]
    pub fn new(collection: CollectionId) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            exclude_status: None,
        }
    }

    /// Add a predicate
    #[inline]
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Leave out documents with this status
    #[inline]
    #[must_use]
    pub fn excluding(mut self, status: EntityStatus) -> Self {
        self.exclude_status = Some(status);
        self
    }

    /// Leave out soft-deleted documents
    #[inline]
    #[must_use]
    pub fn live_only(self) -> Self {
        self.excluding(EntityStatus::Deleted)
    }

    /// Largest "is one of" filter in the query
    #[must_use]
    pub fn max_in_values(&self) -> usize {
        self.filters
            .iter()
            .filter_map(|f| match f {
                Filter::In { values, .. } => Some(values.len()),
                Filter::Eq { .. } => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Whether a document satisfies every predicate and the status exclusion
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        if self.exclude_status == Some(doc.status()) {
            return false;
        }
        self.filters.iter().all(|f| f.matches(doc))
    }
}
