//! cache_health and cache_invalidate tool implementations.
//!
//! cache_invalidate also zeroes the hit/miss counters on request.

use abr_core::{CacheHealth, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Output structure for cache_health tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheHealthOutput {
    #[serde(flatten)]
    pub cache: CacheHealth,
    /// Books currently held in the record store.
    pub stored_books: u64,
}

/// Input parameters for cache_invalidate tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheInvalidateParams {
    /// Drop every cached search that contains this ASIN or ISBN-13.
    #[serde(default)]
    pub asin: Option<String>,

    /// Drop all cached searches and suggestions.
    #[serde(default)]
    pub all: bool,

    /// Zero the cache counters reported by cache_health.
    #[serde(default)]
    pub reset_metrics: bool,
}

/// Output structure for cache_invalidate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInvalidateOutput {
    /// Number of cache entries removed.
    pub invalidated: usize,
    /// Whether the counters were zeroed.
    pub metrics_reset: bool,
}

/// Implementation of the cache_health tool.
pub async fn health_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let cache = state.cache();
    cache.metrics().log_summary();
    let stored_books = state.db.count_books().await?;
    json_result(&CacheHealthOutput { cache: cache.health(), stored_books })
}

/// Implementation of the cache_invalidate tool.
pub async fn invalidate_impl(state: &AppState, params: CacheInvalidateParams) -> Result<CallToolResult, McpError> {
    let cache = state.cache();
    let invalidated = match (params.all, params.asin.as_deref().map(str::trim)) {
        (true, _) => {
            let health = cache.health();
            cache.invalidate_all();
            health.cache_size + health.suggestion_entries
        }
        (false, Some(asin)) if !asin.is_empty() => cache.invalidate_by_identifier(asin),
        _ if params.reset_metrics => 0,
        _ => return Err(Error::InvalidInput("one of asin, all, or reset_metrics must be specified".into()).into()),
    };

    if params.reset_metrics {
        cache.metrics().log_summary();
        cache.metrics().reset();
    }

    tracing::info!(invalidated, all = params.all, metrics_reset = params.reset_metrics, "cache invalidated");
    json_result(&CacheInvalidateOutput { invalidated, metrics_reset: params.reset_metrics })
}
