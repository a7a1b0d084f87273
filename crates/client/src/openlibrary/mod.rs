//! OpenLibrary catalog adapter.
//!
//! - **Endpoint**: `https://openlibrary.org/search.json`
//! - **Limits**: at most 100 docs per request; English results only.
//!
//! Docs are works, not editions: a record takes the first valid ISBN of
//! each length among the work's editions.

pub mod response;

use std::time::Duration;

use abr_core::{BookRecord, BookSource, CatalogAdapter, CatalogQuery, Region};
use async_trait::async_trait;

use crate::error::CatalogError;
use crate::http::{CatalogHttp, HttpConfig};
use response::SearchResponse;

pub const OPENLIBRARY_SEARCH_URL: &str = "https://openlibrary.org/search.json";

/// OpenLibrary page size limit.
const MAX_PAGE_SIZE: usize = 100;

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct OpenLibraryClient {
    http: CatalogHttp,
    base_url: String,
}

impl OpenLibraryClient {
    pub fn new(config: &HttpConfig) -> Result<Self, CatalogError> {
        Ok(Self {
            http: CatalogHttp::new(config, MIN_REQUEST_INTERVAL)?,
            base_url: OPENLIBRARY_SEARCH_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn search(&self, q: &str, limit: usize) -> Result<Vec<BookRecord>, CatalogError> {
        let params = [
            ("q", q.to_string()),
            ("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("lang", "en".to_string()),
        ];
        let response: SearchResponse = self.http.get_json(&self.base_url, &params, &[]).await?;
        Ok(response.docs.into_iter().map(BookRecord::from).collect())
    }

    async fn search_or_empty(&self, q: &str, limit: usize) -> Vec<BookRecord> {
        match self.search(q, limit).await {
            Ok(books) => {
                tracing::debug!(q, count = books.len(), "openlibrary search complete");
                books
            }
            Err(e) => {
                tracing::warn!(q, error = %e, "openlibrary search failed");
                Vec::new()
            }
        }
    }
}

pub fn author_query(author: &str) -> String {
    format!("author:{author}")
}

#[async_trait]
impl CatalogAdapter for OpenLibraryClient {
    fn source(&self) -> BookSource {
        BookSource::OpenLibrary
    }

    async fn search_by_query(&self, query: &CatalogQuery) -> Vec<BookRecord> {
        self.search_or_empty(&query.keywords, query.max_results).await
    }

    async fn search_by_author(&self, author: &str, max_results: usize) -> Vec<BookRecord> {
        self.search_or_empty(&author_query(author), max_results).await
    }

    async fn fetch_by_identifier(&self, id: &str, _region: Region) -> Option<BookRecord> {
        let q = format!("isbn:{}", abr_core::isbn::normalize_isbn(id));
        self.search_or_empty(&q, 1).await.into_iter().next()
    }
}
