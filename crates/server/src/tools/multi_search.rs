//! unified_search and author_search tool implementations.
//!
//! Both fan out to every selected catalog and merge results by identifier.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{BookListOutput, check_num_results, json_result, parse_region, parse_sources};
use crate::state::AppState;

/// Input parameters for unified_search tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UnifiedSearchParams {
    /// Search keywords.
    pub q: String,

    /// Number of results after merging (default 30).
    #[serde(default = "default_unified_results")]
    pub num_results: usize,

    /// Audible marketplace (default from configuration).
    #[serde(default)]
    pub region: Option<String>,

    /// Sources to query: audible, google_books, openlibrary. Defaults to all enabled sources.
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

fn default_unified_results() -> usize {
    30
}

/// Input parameters for author_search tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AuthorSearchParams {
    /// Author name.
    pub author: String,

    /// Number of results after merging (default 100).
    #[serde(default = "default_author_results")]
    pub num_results: usize,

    /// Audible marketplace (default from configuration).
    #[serde(default)]
    pub region: Option<String>,

    /// Sources to query: audible, google_books, openlibrary. Defaults to all enabled sources.
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

fn default_author_results() -> usize {
    100
}

/// Implementation of the unified_search tool.
pub async fn unified_impl(state: &AppState, params: UnifiedSearchParams) -> Result<CallToolResult, McpError> {
    let region = parse_region(&state.config, params.region.as_deref())?;
    let sources = parse_sources(&state.config, params.sources.as_deref())?;
    let num_results = check_num_results(params.num_results)?;

    let books = state.search.unified_search(&params.q, num_results, &sources, region).await;
    json_result(&BookListOutput::new(&books))
}

/// Implementation of the author_search tool.
pub async fn author_impl(state: &AppState, params: AuthorSearchParams) -> Result<CallToolResult, McpError> {
    let region = parse_region(&state.config, params.region.as_deref())?;
    let sources = parse_sources(&state.config, params.sources.as_deref())?;
    let num_results = check_num_results(params.num_results)?;

    let books = state.search.search_author(&params.author, num_results, &sources, region).await;
    json_result(&BookListOutput::new(&books))
}
