//! Google Books catalog adapter.
//!
//! - **Endpoint**: `https://www.googleapis.com/books/v1/volumes`
//! - **Authentication**: optional `key` parameter; anonymous requests share a lower quota.
//! - **Limits**: at most 40 results per request.
//!
//! Records carry ISBNs and the volume id but no ASIN, narrators, or runtime.

pub mod response;

use std::time::Duration;

use abr_core::{BookRecord, BookSource, CatalogAdapter, CatalogQuery, Region};
use async_trait::async_trait;

use crate::error::CatalogError;
use crate::http::{CatalogHttp, HttpConfig};
use response::VolumesResponse;

pub const GOOGLE_BOOKS_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// Google Books API page size limit.
const MAX_PAGE_SIZE: usize = 40;

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct GoogleBooksClient {
    http: CatalogHttp,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleBooksClient {
    pub fn new(config: &HttpConfig, api_key: Option<String>) -> Result<Self, CatalogError> {
        Ok(Self {
            http: CatalogHttp::new(config, MIN_REQUEST_INTERVAL)?,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: GOOGLE_BOOKS_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn params(&self, q: String, max_results: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", q),
            ("maxResults", max_results.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("printType", "books".to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        params
    }

    pub async fn volumes(&self, q: String, max_results: usize) -> Result<Vec<BookRecord>, CatalogError> {
        let response: VolumesResponse = self.http.get_json(&self.base_url, &self.params(q, max_results), &[]).await?;
        Ok(response.items.into_iter().map(BookRecord::from).collect())
    }

    async fn volumes_or_empty(&self, q: String, max_results: usize) -> Vec<BookRecord> {
        match self.volumes(q.clone(), max_results).await {
            Ok(books) => {
                tracing::debug!(q = %q, count = books.len(), "google books search complete");
                books
            }
            Err(e) => {
                tracing::warn!(q = %q, error = %e, "google books search failed");
                Vec::new()
            }
        }
    }
}

/// `inauthor:"Name"` query for author search.
pub fn author_query(author: &str) -> String {
    format!("inauthor:\"{}\"", author.replace('"', ""))
}

#[async_trait]
impl CatalogAdapter for GoogleBooksClient {
    fn source(&self) -> BookSource {
        BookSource::GoogleBooks
    }

    async fn search_by_query(&self, query: &CatalogQuery) -> Vec<BookRecord> {
        self.volumes_or_empty(query.keywords.clone(), query.max_results).await
    }

    async fn search_by_author(&self, author: &str, max_results: usize) -> Vec<BookRecord> {
        self.volumes_or_empty(author_query(author), max_results).await
    }

    async fn fetch_by_identifier(&self, id: &str, _region: Region) -> Option<BookRecord> {
        self.volumes_or_empty(format!("isbn:{}", abr_core::isbn::normalize_isbn(id)), 1)
            .await
            .into_iter()
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_query() {
        assert_eq!(author_query("Bart D. Ehrman"), "inauthor:\"Bart D. Ehrman\"");
        assert_eq!(author_query("The \"Rock\""), "inauthor:\"The Rock\"");
    }

    #[test]
    fn test_params() {
        let client = GoogleBooksClient::new(&HttpConfig::default(), Some("secret".into())).unwrap();
        let params = client.params("dune".into(), 100);
        assert!(params.contains(&("maxResults", "40".to_string())));
        assert!(params.contains(&("printType", "books".to_string())));
        assert!(params.contains(&("key", "secret".to_string())));

        let anonymous = GoogleBooksClient::new(&HttpConfig::default(), Some(String::new())).unwrap();
        assert!(anonymous.params("dune".into(), 0).iter().all(|(k, _)| *k != "key"));
        assert!(anonymous.params("dune".into(), 0).contains(&("maxResults", "1".to_string())));
    }

    #[tokio::test]
    async fn test_failure_degrades() {
        let client = GoogleBooksClient::new(&HttpConfig::new(Duration::from_millis(500), "abr-test"), None)
            .unwrap()
            .with_base_url("http://127.0.0.1:9/volumes");
        assert!(client.search_by_query(&CatalogQuery::new("dune", 10)).await.is_empty());
        assert!(client.fetch_by_identifier("9780441013593", Region::Us).await.is_none());
    }
}
