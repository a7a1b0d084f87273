//! search_suggestions tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, parse_region};
use crate::state::AppState;

/// Input parameters for search_suggestions tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SuggestionsParams {
    /// Partial query as typed so far.
    pub q: String,

    /// Audible marketplace (default from configuration).
    #[serde(default)]
    pub region: Option<String>,
}

/// Output structure for search_suggestions tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuggestionsOutput {
    pub suggestions: Vec<String>,
}

/// Implementation of the search_suggestions tool.
pub async fn suggestions_impl(state: &AppState, params: SuggestionsParams) -> Result<CallToolResult, McpError> {
    let region = parse_region(&state.config, params.region.as_deref())?;
    let suggestions = state.suggestions.suggest(&params.q, region).await;
    json_result(&SuggestionsOutput { suggestions })
}
