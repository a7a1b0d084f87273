//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::{
    book_request::{BookDownloadedParams, BookRequestParams, downloaded_impl, request_impl},
    book_search::{BookSearchParams, search_impl},
    cache::{CacheInvalidateParams, health_impl, invalidate_impl},
    multi_search::{AuthorSearchParams, UnifiedSearchParams, author_impl, unified_impl},
    suggestions::{SuggestionsParams, suggestions_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for abr-search.
#[derive(Clone)]
pub struct AbrServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl AbrServer {
    pub fn new(state: AppState) -> Self {
        Self { state: Arc::new(state), tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Search Audible by keywords, ASIN, or ISBN. Results are cached for a week; with use_hybrid, thin results are topped up from Google Books and previously seen books."
    )]
    async fn book_search(&self, params: Parameters<BookSearchParams>) -> Result<CallToolResult, McpError> {
        search_impl(&self.state, params.0).await
    }

    #[tool(description = "Search Audible, Google Books, and OpenLibrary at once and merge duplicates by ISBN or ASIN.")]
    async fn unified_search(&self, params: Parameters<UnifiedSearchParams>) -> Result<CallToolResult, McpError> {
        unified_impl(&self.state, params.0).await
    }

    #[tool(description = "List books by an author across the selected catalogs, merged by ISBN or ASIN.")]
    async fn author_search(&self, params: Parameters<AuthorSearchParams>) -> Result<CallToolResult, McpError> {
        author_impl(&self.state, params.0).await
    }

    #[tool(description = "Type-ahead title suggestions for a partial query.")]
    async fn search_suggestions(&self, params: Parameters<SuggestionsParams>) -> Result<CallToolResult, McpError> {
        suggestions_impl(&self.state, params.0).await
    }

    #[tool(description = "Report search cache size and hit, miss, eviction, and rehydration counters.")]
    async fn cache_health(&self) -> Result<CallToolResult, McpError> {
        health_impl(&self.state).await
    }

    #[tool(
        description = "Drop cached searches containing an ASIN, or every cached search and suggestion with all=true. reset_metrics=true zeroes the cache counters."
    )]
    async fn cache_invalidate(&self, params: Parameters<CacheInvalidateParams>) -> Result<CallToolResult, McpError> {
        invalidate_impl(&self.state, params.0).await
    }

    #[tool(description = "Add or withdraw a user's request for an audiobook. Requested books are kept out of stale-record cleanup.")]
    async fn book_request(&self, params: Parameters<BookRequestParams>) -> Result<CallToolResult, McpError> {
        request_impl(&self.state, params.0).await
    }

    #[tool(description = "Mark a stored audiobook as downloaded (or not).")]
    async fn book_downloaded(&self, params: Parameters<BookDownloadedParams>) -> Result<CallToolResult, McpError> {
        downloaded_impl(&self.state, params.0).await
    }
}

impl ServerHandler for AbrServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "abr-search".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
