//! Audible catalog adapter.
//!
//! - **Search**: `https://api.audible{tld}/1.0/catalog/products`, sorted by
//!   relevance. Returns ASINs only, so records are partial.
//! - **Lookup**: Audimeta first, Audnexus as fallback. `None` only when both miss.
//! - **Suggestions**: `https://api.audible{tld}/1.0/searchsuggestions`.
//!
//! Every failure is logged and degrades to an empty result.

pub mod metadata;
pub mod response;

use std::time::Duration;

use abr_core::{BookRecord, BookSource, CatalogAdapter, CatalogQuery, Region, SuggestionProvider};
use async_trait::async_trait;

use crate::error::CatalogError;
use crate::http::{CatalogHttp, HttpConfig};
use metadata::{AUDIMETA_BASE_URL, AUDNEXUS_BASE_URL, AudimetaBook, AudnexusBook, CLIENT_AGENT};
use response::{ProductsResponse, SuggestionsResponse};

/// Audible rejects larger pages.
const MAX_PAGE_SIZE: usize = 50;

/// Upstream endpoints, overridable for testing against a local server.
#[derive(Debug, Clone)]
pub struct AudibleEndpoints {
    /// Replaces `https://api.audible{tld}` when set.
    pub catalog_base: Option<String>,
    pub audimeta_base: String,
    pub audnexus_base: String,
}

impl Default for AudibleEndpoints {
    fn default() -> Self {
        Self {
            catalog_base: None,
            audimeta_base: AUDIMETA_BASE_URL.to_string(),
            audnexus_base: AUDNEXUS_BASE_URL.to_string(),
        }
    }
}

impl AudibleEndpoints {
    pub fn catalog_base(&self, region: Region) -> String {
        match &self.catalog_base {
            Some(base) => base.clone(),
            None => format!("https://api.audible{}", region.tld()),
        }
    }
}

/// Audible catalog client.
#[derive(Debug, Clone)]
pub struct AudibleClient {
    http: CatalogHttp,
    endpoints: AudibleEndpoints,
}

impl AudibleClient {
    pub fn new(config: &HttpConfig) -> Result<Self, CatalogError> {
        Self::with_endpoints(config, AudibleEndpoints::default())
    }

    pub fn with_endpoints(config: &HttpConfig, endpoints: AudibleEndpoints) -> Result<Self, CatalogError> {
        Ok(Self { http: CatalogHttp::new(config, Duration::ZERO)?, endpoints })
    }

    /// Relevance-ordered ASINs for a keyword query.
    pub async fn search_asins(&self, query: &CatalogQuery) -> Result<Vec<String>, CatalogError> {
        let url = format!("{}/1.0/catalog/products", self.endpoints.catalog_base(query.region));
        let params = [
            ("num_results", query.max_results.min(MAX_PAGE_SIZE).to_string()),
            ("products_sort_by", "Relevance".to_string()),
            ("keywords", query.keywords.clone()),
            ("page", query.page.to_string()),
        ];
        let response: ProductsResponse = self.http.get_json(&url, &params, &[]).await?;
        Ok(response.asins())
    }

    pub async fn audimeta_book(&self, asin: &str, region: Region) -> Result<BookRecord, CatalogError> {
        let url = metadata::audimeta_url(&self.endpoints.audimeta_base, asin);
        let raw: AudimetaBook = self
            .http
            .get_json(&url, &[("region", region.code().to_string())], &[CLIENT_AGENT])
            .await?;
        Ok(raw.into())
    }

    pub async fn audnexus_book(&self, asin: &str, region: Region) -> Result<BookRecord, CatalogError> {
        let url = metadata::audnexus_url(&self.endpoints.audnexus_base, asin);
        let raw: AudnexusBook = self
            .http
            .get_json(&url, &[("region", region.code().to_string())], &[CLIENT_AGENT])
            .await?;
        Ok(raw.into())
    }

    pub async fn search_suggestions(&self, query: &str, region: Region) -> Result<Vec<String>, CatalogError> {
        let url = format!("{}/1.0/searchsuggestions", self.endpoints.catalog_base(region));
        let params = [("key_strokes", query.to_string()), ("site_variant", "desktop".to_string())];
        let response: SuggestionsResponse = self.http.get_json(&url, &params, &[]).await?;
        Ok(response.titles())
    }
}

fn log_miss(provider: &str, asin: &str, err: &CatalogError) {
    if err.is_not_found() {
        tracing::debug!(provider, asin, "book not found");
    } else {
        tracing::warn!(provider, asin, error = %err, "book lookup failed");
    }
}

#[async_trait]
impl CatalogAdapter for AudibleClient {
    fn source(&self) -> BookSource {
        BookSource::Audible
    }

    async fn search_by_query(&self, query: &CatalogQuery) -> Vec<BookRecord> {
        match self.search_asins(query).await {
            Ok(asins) => asins.into_iter().map(BookRecord::from_asin).collect(),
            Err(e) => {
                tracing::warn!(query = %query.keywords, region = %query.region, error = %e, "audible search failed");
                Vec::new()
            }
        }
    }

    async fn fetch_by_identifier(&self, id: &str, region: Region) -> Option<BookRecord> {
        match self.audimeta_book(id, region).await {
            Ok(book) => return Some(book),
            Err(e) => log_miss("audimeta", id, &e),
        }
        match self.audnexus_book(id, region).await {
            Ok(book) => Some(book),
            Err(e) => {
                log_miss("audnexus", id, &e);
                None
            }
        }
    }
}

#[async_trait]
impl SuggestionProvider for AudibleClient {
    async fn suggestions(&self, query: &str, region: Region) -> Option<Vec<String>> {
        match self.search_suggestions(query, region).await {
            Ok(titles) => Some(titles),
            Err(e) => {
                tracing::warn!(query, region = %region, error = %e, "audible suggestions failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_base_per_region() {
        let endpoints = AudibleEndpoints::default();
        assert_eq!(endpoints.catalog_base(Region::Us), "https://api.audible.com");
        assert_eq!(endpoints.catalog_base(Region::Uk), "https://api.audible.co.uk");
        assert_eq!(endpoints.catalog_base(Region::Jp), "https://api.audible.co.jp");
    }

    #[test]
    fn test_catalog_base_override() {
        let endpoints = AudibleEndpoints { catalog_base: Some("http://127.0.0.1:9".into()), ..Default::default() };
        assert_eq!(endpoints.catalog_base(Region::De), "http://127.0.0.1:9");
    }

    /// Nothing listens on the discard port, so every call fails fast.
    fn unreachable_client() -> AudibleClient {
        let endpoints = AudibleEndpoints {
            catalog_base: Some("http://127.0.0.1:9".into()),
            audimeta_base: "http://127.0.0.1:9".into(),
            audnexus_base: "http://127.0.0.1:9".into(),
        };
        let config = HttpConfig::new(Duration::from_millis(500), "abr-test");
        AudibleClient::with_endpoints(&config, endpoints).unwrap()
    }

    #[tokio::test]
    async fn test_failures_degrade() {
        let client = unreachable_client();
        assert!(client.search_by_query(&CatalogQuery::new("dune", 10)).await.is_empty());
        assert!(client.fetch_by_identifier("B0036I54I6", Region::Us).await.is_none());
        assert!(client.suggestions("dun", Region::Us).await.is_none());
    }
}
