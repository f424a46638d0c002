//! Error types for the store boundary

use crate::types::DocRef;

/// Identifier validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Empty or whitespace id
    #[error("{0} id must not be empty")]
    Empty(&'static str),
}

/// Errors raised by a store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An "is one of" filter exceeds the store's value limit
    #[error("filter on '{field}' has {len} values, limit is {max}")]
    FilterTooLarge {
        /// Filtered field
        field: String,
        /// Values supplied
        len: usize,
        /// Store limit
        max: usize,
    },

    /// Query is structurally invalid
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Write group exceeds the store's operation limit
    #[error("write group has {len} operations, limit is {max}")]
    GroupTooLarge {
        /// Operations supplied
        len: usize,
        /// Store limit
        max: usize,
    },

    /// Update targets a document that does not exist
    #[error("document not found: {0}")]
    NotFound(DocRef),

    /// Stored document does not match the entity shape
    #[error("malformed document {doc}: {reason}")]
    Malformed {
        /// Offending document
        doc: DocRef,
        /// What is wrong
        reason: String,
    },

    /// Backend rejected or could not serve the request
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create malformed-document error
    pub fn malformed(doc: &DocRef, reason: impl Into<String>) -> Self {
        Self::Malformed {
            doc: doc.clone(),
            reason: reason.into(),
        }
    }

    /// Check if error is transient
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn store_error_display() {
        let err = StoreError::FilterTooLarge {
            field: "projectId".to_string(),
            len: 31,
            max: 30,
        };
        assert_eq!(
            err.to_string(),
            "filter on 'projectId' has 31 values, limit is 30"
        );
    }

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(StoreError::Unavailable("timeout".to_string()).is_retryable());
        assert!(!StoreError::InvalidQuery("x".to_string()).is_retryable());
    }
}
