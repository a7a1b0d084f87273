//! Application configuration with layered loading.
//!
//! Configuration is merged from three layers:
//!
//! 1. Environment variables (ABR_*)
//! 2. TOML config file (if ABR_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::Region;
use crate::book::BookSource;

mod validation;

pub use validation::ConfigError;

/// Catalogs a unified search fans out to.
pub const SEARCHABLE_SOURCES: [BookSource; 3] = [BookSource::Audible, BookSource::GoogleBooks, BookSource::OpenLibrary];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ABR_*)
/// 2. TOML config file (if ABR_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite book database.
    ///
    /// Set via ABR_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for catalog requests.
    ///
    /// Set via ABR_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout for upstream catalogs, in milliseconds.
    ///
    /// Set via ABR_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Audible marketplace used when a request names none.
    ///
    /// Set via ABR_DEFAULT_REGION environment variable.
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Google Books API key. Optional; anonymous requests get a lower quota.
    ///
    /// Set via ABR_GOOGLE_BOOKS_API_KEY environment variable.
    #[serde(default)]
    pub google_books_api_key: Option<String>,

    /// Catalogs queried by unified and author search.
    ///
    /// Set via ABR_ENABLED_SOURCES, e.g. `[audible, openlibrary]`.
    #[serde(default = "default_sources")]
    pub enabled_sources: Vec<BookSource>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./abr-books.sqlite")
}

fn default_user_agent() -> String {
    "audiobookrequest/0.1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_region() -> String {
    Region::default().code().into()
}

fn default_sources() -> Vec<BookSource> {
    SEARCHABLE_SOURCES.to_vec()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            default_region: default_region(),
            google_books_api_key: None,
            enabled_sources: default_sources(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured default region; falls back to `us` if unparseable.
    ///
    /// [`AppConfig::load`] rejects unparseable regions, so the fallback only
    /// applies to hand-built configs.
    pub fn region(&self) -> Region {
        self.default_region.parse().unwrap_or_default()
    }

    pub fn source_enabled(&self, source: BookSource) -> bool {
        self.enabled_sources.contains(&source)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ABR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ABR_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
