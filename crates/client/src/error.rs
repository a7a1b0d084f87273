//! Catalog client error types.
//!
//! These never leave the crate through the [`abr_core::CatalogAdapter`]
//! methods: adapters log them and answer with an empty list or `None`.

use std::sync::Arc;

/// Errors from an upstream catalog request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Rate limited by the upstream.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// The upstream has no such record.
    #[error("not found")]
    NotFound,

    /// Non-success HTTP status.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Response body did not match the expected schema.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { CatalogError::Timeout } else { CatalogError::Network(Arc::new(err)) }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

impl CatalogError {
    /// Whether the failure is an expected miss rather than a fault worth a warning.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound)
    }
}
