//! Application configuration
//!
//! Every section is optional in the TOML file; missing keys take their
//! defaults:
//!
//! ```toml
//! [store]
//! max_in_values = 30
//! max_group_ops = 500
//!
//! [ordering]
//! gap = 1000
//! base = 1000
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use welddesk_order::OrderConfig;
use welddesk_store::StoreLimits;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive (`RUST_LOG` overrides it)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend limits the engine must respect
    pub store: StoreLimits,
    /// Order key spacing
    pub ordering: OrderConfig,
    /// Log output
    pub logging: LogConfig,
}

impl AppConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed TOML or invalid values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` for malformed TOML or invalid values
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With store limits
    #[inline]
    #[must_use]
    pub fn with_store(mut self, store: StoreLimits) -> Self {
        self.store = store;
        self
    }

    /// With ordering
    #[inline]
    #[must_use]
    pub fn with_ordering(mut self, ordering: OrderConfig) -> Self {
        self.ordering = ordering;
        self
    }

    /// With logging
    #[inline]
    #[must_use]
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [store]
            max_group_ops = 100

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.max_group_ops.get(), 100);
        assert_eq!(config.store.max_in_values.get(), 30);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.ordering.gap.get(), 1000);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = AppConfig::from_toml_str("[store]\nmax_in_values = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = AppConfig::load("/nonexistent/welddesk.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/welddesk.toml"));
    }
}
