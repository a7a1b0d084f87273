//! book_search tool implementation.
//!
//! Keyword, ASIN, or ISBN search against Audible through the cached
//! pipeline, optionally topped up from Google Books and the local store.

use abr_core::{BookRecord, CatalogQuery};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{BookView, check_num_results, check_offset, json_result, parse_region};
use crate::state::AppState;

/// Input parameters for book_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookSearchParams {
    /// Keywords, an ASIN, or an ISBN.
    pub q: String,

    /// Number of results (default 20).
    #[serde(default = "default_num_results")]
    pub num_results: usize,

    /// Zero-based page (default 0).
    #[serde(default)]
    pub page: usize,

    /// Audible marketplace: us, ca, uk, au, fr, de, jp, it, in, es, br.
    #[serde(default)]
    pub region: Option<String>,

    /// Fall back to Google Books and local records when Audible returns few results (default true).
    #[serde(default = "default_true")]
    pub use_hybrid: bool,
}

impl Default for BookSearchParams {
    fn default() -> Self {
        Self { q: String::new(), num_results: default_num_results(), page: 0, region: None, use_hybrid: true }
    }
}

fn default_num_results() -> usize {
    20
}

fn default_true() -> bool {
    true
}

/// Output structure for book_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookSearchOutput {
    pub books: Vec<BookView>,
    pub page: usize,
    pub region: String,
}

/// Implementation of the book_search tool.
pub async fn search_impl(state: &AppState, params: BookSearchParams) -> Result<CallToolResult, McpError> {
    let region = parse_region(&state.config, params.region.as_deref())?;
    let num_results = check_num_results(params.num_results)?;
    let start = check_offset(params.page, num_results)?;
    let q = params.q.trim();

    let books = if q.is_empty() || num_results == 0 {
        Vec::new()
    } else {
        match state.search.primary().clear_old_book_caches().await {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "cleared stale book records"),
            Err(e) => tracing::warn!(error = %e, "failed to clear stale book records"),
        }

        if params.use_hybrid {
            let books = state.search.hybrid_search(q, start + num_results, region).await;
            books.into_iter().skip(start).take(num_results).collect()
        } else {
            let query = CatalogQuery::new(q, num_results).page(params.page).region(region);
            state.search.primary().search(&query).await
        }
    };

    let books = with_request_counts(state, &books).await;
    let output = BookSearchOutput { books, page: params.page, region: region.to_string() };
    json_result(&output)
}

async fn with_request_counts(state: &AppState, books: &[BookRecord]) -> Vec<BookView> {
    let mut views = Vec::with_capacity(books.len());
    for book in books {
        let mut view = BookView::from(book);
        if let Some(asin) = &book.asin {
            match state.db.request_count(asin).await {
                Ok(count) => view.requests = Some(count),
                Err(e) => tracing::warn!(asin, error = %e, "failed to count requests"),
            }
        }
        views.push(view);
    }
    views
}
