//! Error types for the lifecycle service
//!
//! Provides error handling for:
//! - Unauthenticated requests
//! - Cascade and store failures
//! - Illegal status transitions
//! - Configuration loading

use crate::status::TransitionError;
use std::path::PathBuf;
use welddesk_cascade::{CascadeError, InvalidGraphError};
use welddesk_store::{CollectionId, DocRef, StoreError};

/// Lifecycle operation errors
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// No authenticated actor; nothing was read or written
    #[error("authentication required")]
    AuthRequired,

    /// Cascade failed
    #[error("cascade failed: {0}")]
    Cascade(#[from] CascadeError),

    /// Application graph failed validation
    #[error("invalid cascade graph: {0}")]
    Graph(#[from] InvalidGraphError),

    /// Store read or write failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Status change not allowed
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Target record does not exist
    #[error("not found: {0}")]
    NotFound(DocRef),

    /// Single delete on a collection that owns dependents
    #[error("{0} records own dependents; use a cascade delete")]
    CascadeRequired(CollectionId),
}

impl LifecycleError {
    /// Whether re-running the same operation may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cascade(e) => e.is_retryable(),
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML or invalid values (e.g. a zero limit)
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_required_is_not_retryable() {
        assert!(!LifecycleError::AuthRequired.is_retryable());
        let unavailable = LifecycleError::Store(StoreError::Unavailable("offline".to_string()));
        assert!(unavailable.is_retryable());
    }
}
