//! Contract between the search pipeline and upstream catalogs.
//!
//! Implementations never fail: network, status, and parse errors are logged
//! inside the adapter and surface here as an empty list or `None`.

use async_trait::async_trait;

use crate::Region;
use crate::book::{BookRecord, BookSource};

/// Parameters for one keyword search against one catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub keywords: String,
    pub max_results: usize,
    pub page: usize,
    /// Only meaningful for region-aware catalogs.
    pub region: Region,
}

impl CatalogQuery {
    pub fn new(keywords: impl Into<String>, max_results: usize) -> Self {
        Self { keywords: keywords.into(), max_results, page: 0, region: Region::default() }
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }
}

/// One upstream book catalog.
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Which source tag this catalog stamps on its records.
    fn source(&self) -> BookSource;

    /// Keyword search, in upstream relevance order.
    ///
    /// Records may be partial: the primary audiobook catalog returns ASINs only.
    async fn search_by_query(&self, query: &CatalogQuery) -> Vec<BookRecord>;

    /// Search for books by an author. Defaults to a keyword search on the name.
    async fn search_by_author(&self, author: &str, max_results: usize) -> Vec<BookRecord> {
        self.search_by_query(&CatalogQuery::new(author, max_results)).await
    }

    /// Fetch a complete record by identifier.
    async fn fetch_by_identifier(&self, id: &str, region: Region) -> Option<BookRecord>;
}

/// Type-ahead suggestions for a partial query.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// `None` when the upstream call failed; such results are not cached.
    async fn suggestions(&self, query: &str, region: Region) -> Option<Vec<String>>;
}
