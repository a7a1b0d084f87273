//! Configuration validation rules.
//!
//! Runs on `AppConfig` values after they have been loaded from environment,
//! files, or defaults.

use crate::Region;
use crate::book::BookSource;
use crate::config::{AppConfig, SEARCHABLE_SOURCES};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `default_region` is not a known Audible marketplace
    /// - `enabled_sources` names a merged source tag
    ///
    /// Returns `ConfigError::Missing` if `enabled_sources` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if let Err(e) = self.default_region.parse::<Region>() {
            return Err(ConfigError::Invalid { field: "default_region".into(), reason: e.to_string() });
        }

        if self.enabled_sources.is_empty() {
            return Err(ConfigError::Missing {
                field: "enabled_sources".into(),
                hint: "Set ABR_ENABLED_SOURCES to at least one of audible, google_books, openlibrary".into(),
            });
        }
        if let Some(bad) = self.enabled_sources.iter().find(|s| !SEARCHABLE_SOURCES.contains(s)) {
            return Err(ConfigError::Invalid {
                field: "enabled_sources".into(),
                reason: format!("{bad} is not a searchable catalog"),
            });
        }

        if self.google_books_api_key.is_none() && self.enabled_sources.contains(&BookSource::GoogleBooks) {
            tracing::debug!("no google_books_api_key set; using anonymous Google Books quota");
        }

        Ok(())
    }
}
