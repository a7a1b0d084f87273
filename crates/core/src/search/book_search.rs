//! Single-catalog search: direct lookup, cache, variant fan-out, reconcile, rank.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use futures_util::future::join_all;

use super::expand::expand_query;
use super::rank::RankTracker;
use crate::Error;
use crate::book::BookRecord;
use crate::cache::{REFETCH_TTL_SECS, SearchCache, SearchCacheKey};
use crate::catalog::{CatalogAdapter, CatalogQuery};
use crate::isbn::is_direct_lookup;
use crate::store::RecordStore;

/// Upper bound on results requested per query variant.
pub const MAX_RESULTS_PER_VARIANT: usize = 50;

/// Search pipeline over the primary audiobook catalog.
///
/// Cheap to clone; the catalog, store, and cache are shared.
#[derive(Clone)]
pub struct BookSearch {
    catalog: Arc<dyn CatalogAdapter>,
    store: Arc<dyn RecordStore>,
    cache: Arc<SearchCache>,
}

impl BookSearch {
    pub fn new(catalog: Arc<dyn CatalogAdapter>, store: Arc<dyn RecordStore>, cache: Arc<SearchCache>) -> Self {
        Self { catalog, store, cache }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogAdapter> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    /// Run a keyword search.
    ///
    /// Never fails: upstream and storage problems degrade to fewer results.
    /// `request.max_results` is the number of books returned.
    pub async fn search(&self, request: &CatalogQuery) -> Vec<BookRecord> {
        let query = request.keywords.trim();
        if query.is_empty() || request.max_results == 0 {
            return Vec::new();
        }

        if is_direct_lookup(query)
            && let Some(book) = self.lookup(query, request).await
        {
            return vec![book];
        }

        let key = SearchCacheKey::new(query, request.max_results, request.page, request.region);
        if let Some(books) = self.rehydrate(&key).await {
            return books;
        }
        self.cache.metrics().record_miss();

        let ranks = self.fetch_variants(query, request).await;
        if ranks.is_empty() {
            // Not cached: see the note at the cache write below.
            tracing::info!(query, "no results from any query variant");
            return Vec::new();
        }

        let mut resolved = self.reconcile(&ranks, request).await;
        let books: Vec<BookRecord> = ranks
            .ranked()
            .into_iter()
            .filter_map(|asin| resolved.remove(&asin))
            .take(request.max_results)
            .collect();

        let now = Utc::now();
        // An empty outcome is indistinguishable from an upstream outage, so it
        // is recomputed on the next call instead of pinned for the full TTL.
        if !books.is_empty() {
            self.cache.put_at(&key, &books, now);
        }
        self.cache.sweep_expired(now);

        tracing::info!(query, region = %request.region, candidates = ranks.len(), count = books.len(), "search complete");
        books
    }

    /// Resolve an identifier-shaped query directly. `None` falls through to keyword search.
    async fn lookup(&self, id: &str, request: &CatalogQuery) -> Option<BookRecord> {
        let fetched = self.catalog.fetch_by_identifier(id, request.region).await?;
        let Some(asin) = fetched.asin.clone() else {
            return Some(fetched);
        };

        if let Err(e) = self.store.upsert_many(std::slice::from_ref(&fetched)).await {
            tracing::error!(asin = %asin, error = %e, "failed to store looked-up book");
            return Some(fetched);
        }
        match self.store.get_by_identifier(&asin).await {
            Ok(Some(stored)) => Some(stored),
            Ok(None) => Some(fetched),
            Err(e) => {
                tracing::error!(asin = %asin, error = %e, "failed to reload looked-up book");
                Some(fetched)
            }
        }
    }

    /// Serve a cached search, re-resolving its identifiers against the store.
    ///
    /// Books deleted since the entry was written are dropped from the result.
    /// When none remain, the entry is evicted and the search recomputed.
    async fn rehydrate(&self, key: &SearchCacheKey) -> Option<Vec<BookRecord>> {
        let entry = self.cache.get(key)?;
        let metrics = self.cache.metrics();

        let asins: HashSet<String> = entry.value.iter().filter_map(|b| b.asin.clone()).collect();
        if asins.is_empty() {
            metrics.record_hit();
            return Some(Vec::new());
        }

        match self.store.get_many_by_identifiers(&asins).await {
            Ok(found) if !found.is_empty() => {
                metrics.record_hit();
                let books: Vec<BookRecord> = entry
                    .value
                    .iter()
                    .filter_map(|cached| cached.asin.as_ref().and_then(|a| found.get(a)).cloned())
                    .collect();
                tracing::debug!(cached = entry.value.len(), resolved = books.len(), "search cache hit");
                Some(books)
            }
            Ok(_) => {
                tracing::debug!(cached = asins.len(), "cached books no longer stored; recomputing");
                metrics.record_rehydration_failure();
                self.cache.invalidate(key);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "store lookup failed during cache rehydration");
                metrics.record_staleness_error();
                self.cache.invalidate(key);
                None
            }
        }
    }

    /// Query every variant concurrently and keep each ASIN's best rank.
    async fn fetch_variants(&self, query: &str, request: &CatalogQuery) -> RankTracker {
        let variants = expand_query(query);
        let per_variant = request.max_results.saturating_mul(2).min(MAX_RESULTS_PER_VARIANT);

        let queries: Vec<CatalogQuery> = variants
            .iter()
            .map(|v| CatalogQuery::new(v.as_str(), per_variant).page(request.page).region(request.region))
            .collect();
        let results = join_all(queries.iter().map(|q| self.catalog.search_by_query(q))).await;

        let mut ranks = RankTracker::new();
        for (variant, books) in variants.iter().zip(&results) {
            tracing::debug!(variant = %variant, count = books.len(), "variant results");
            for (rank, book) in books.iter().enumerate() {
                if let Some(asin) = &book.asin {
                    ranks.observe(asin, rank);
                }
            }
        }
        ranks
    }

    /// Load known books from the store and fetch the rest from the catalog.
    ///
    /// Newly fetched books are upserted; a failed write still returns them.
    async fn reconcile(&self, ranks: &RankTracker, request: &CatalogQuery) -> HashMap<String, BookRecord> {
        let asins: HashSet<String> = ranks.ids().cloned().collect();
        let mut resolved = match self.store.get_many_by_identifiers(&asins).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(error = %e, "failed to load stored books; fetching all from catalog");
                HashMap::new()
            }
        };

        let missing: Vec<&String> = asins.iter().filter(|a| !resolved.contains_key(*a)).collect();
        let fetched = join_all(missing.iter().map(|asin| self.catalog.fetch_by_identifier(asin, request.region))).await;

        let fresh: Vec<(String, BookRecord)> = missing
            .into_iter()
            .zip(fetched)
            .filter_map(|(asin, book)| book.map(|b| (asin.clone(), b)))
            .collect();

        if !fresh.is_empty() {
            let books: Vec<BookRecord> = fresh.iter().map(|(_, b)| b.clone()).collect();
            if let Err(e) = self.store.upsert_many(&books).await {
                tracing::error!(count = books.len(), error = %e, "failed to store fetched books");
            }
        }
        tracing::debug!(stored = resolved.len(), fetched = fresh.len(), "reconciled candidates");

        resolved.extend(fresh);
        resolved
    }

    /// Delete stale, unrequested, undownloaded books and drop cache entries that reference them.
    ///
    /// Returns the number of deleted books.
    pub async fn clear_old_book_caches(&self) -> Result<usize, Error> {
        let cutoff = Utc::now() - TimeDelta::seconds(REFETCH_TTL_SECS);
        let deleted = self.store.delete_stale_unreferenced(cutoff).await?;

        let invalidated: usize = deleted.iter().map(|asin| self.cache.invalidate_by_identifier(asin)).sum();
        if !deleted.is_empty() {
            tracing::info!(deleted = deleted.len(), invalidated, "cleared old book caches");
        }
        Ok(deleted.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookSource;
    use crate::search::testing::{StubCatalog, audiobook};
    use crate::store::BookDb;
    use crate::{Region, store};

    async fn pipeline(catalog: StubCatalog) -> (BookSearch, Arc<StubCatalog>, BookDb) {
        let db = BookDb::open_in_memory().await.unwrap();
        let catalog = Arc::new(catalog);
        let search = BookSearch::new(catalog.clone(), Arc::new(db.clone()), Arc::new(SearchCache::default()));
        (search, catalog, db)
    }

    fn ehrman_catalog() -> StubCatalog {
        StubCatalog::new(BookSource::Audible)
            .with_asins("bart ehrman", &["A1", "A2"])
            .with_asins("ehrman", &["A3", "A1"])
            .with_book("A1", audiobook("A1", "Misquoting Jesus", "Bart D. Ehrman"))
            .with_book("A2", audiobook("A2", "How Jesus Became God", "Bart D. Ehrman"))
            .with_book("A3", audiobook("A3", "Heaven and Hell", "Bart D. Ehrman"))
    }

    #[tokio::test]
    async fn test_variant_ranking() {
        let (search, catalog, db) = pipeline(ehrman_catalog()).await;

        let books = search.search(&CatalogQuery::new("bart ehrman", 10)).await;
        let asins: Vec<_> = books.iter().filter_map(|b| b.asin.as_deref()).collect();
        assert_eq!(asins, vec!["A1", "A3", "A2"]);

        // "bart ehrman", "ehrman", "bart"
        assert_eq!(catalog.searches(), 3);
        let requested = catalog.requested.lock().unwrap();
        assert!(requested.iter().all(|q| q.max_results == 20));
        drop(requested);

        assert_eq!(db.count_books().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_per_variant_cap() {
        let (search, catalog, _db) = pipeline(ehrman_catalog()).await;
        search.search(&CatalogQuery::new("bart ehrman", 40)).await;
        let requested = catalog.requested.lock().unwrap();
        assert!(requested.iter().all(|q| q.max_results == MAX_RESULTS_PER_VARIANT));
    }

    #[tokio::test]
    async fn test_truncates_to_num_results() {
        let (search, _catalog, _db) = pipeline(ehrman_catalog()).await;
        let books = search.search(&CatalogQuery::new("bart ehrman", 2)).await;
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].asin.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_known_books_not_refetched() {
        let (search, catalog, db) = pipeline(ehrman_catalog()).await;
        store::RecordStore::upsert_many(&db, &[audiobook("A1", "Misquoting Jesus", "Bart D. Ehrman")])
            .await
            .unwrap();

        search.search(&CatalogQuery::new("bart ehrman", 10)).await;
        assert_eq!(catalog.fetches(), 2);
    }

    #[tokio::test]
    async fn test_direct_lookup_bypasses_pipeline() {
        let catalog = StubCatalog::new(BookSource::Audible)
            .with_book("B0XXXXXXXX", audiobook("B0XXXXXXXX", "Heaven and Hell", "Bart D. Ehrman"));
        let (search, catalog, db) = pipeline(catalog).await;

        let books = search.search(&CatalogQuery::new(" B0XXXXXXXX ", 10)).await;
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Heaven and Hell");
        assert_eq!(catalog.searches(), 0);
        assert!(db.get_book("B0XXXXXXXX").await.unwrap().is_some());
        assert!(search.cache().is_empty());
    }

    #[tokio::test]
    async fn test_direct_lookup_returns_stored_instance() {
        let catalog =
            StubCatalog::new(BookSource::Audible).with_book("1797101021", BookRecord::new("", BookSource::Audible));
        let (search, _catalog, db) = pipeline(catalog).await;
        let mut fetched = audiobook("1797101021", "Heaven and Hell", "Bart D. Ehrman");
        db.upsert_books(std::slice::from_ref(&fetched)).await.unwrap();
        db.set_downloaded("1797101021", true).await.unwrap();

        // the catalog's record is missing its ASIN, so it is returned as is
        let books = search.search(&CatalogQuery::new("1797101021", 5)).await;
        assert_eq!(books.len(), 1);
        assert!(books[0].asin.is_none());

        fetched.title = String::new();
        let catalog = StubCatalog::new(BookSource::Audible).with_book("1797101021", fetched);
        let search = BookSearch::new(Arc::new(catalog), Arc::new(db.clone()), Arc::new(SearchCache::default()));
        let books = search.search(&CatalogQuery::new("1797101021", 5)).await;
        assert_eq!(books[0].title, "Heaven and Hell");
        assert!(books[0].downloaded);
    }

    #[tokio::test]
    async fn test_direct_lookup_miss_falls_through() {
        let catalog = StubCatalog::new(BookSource::Audible)
            .with_asins("B0XXXXXXXX", &["A1"])
            .with_book("A1", audiobook("A1", "Dune", "Frank Herbert"));
        let (search, catalog, _db) = pipeline(catalog).await;

        let books = search.search(&CatalogQuery::new("B0XXXXXXXX", 10)).await;
        assert_eq!(books.len(), 1);
        assert_eq!(catalog.searches(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_catalog() {
        let (search, catalog, _db) = pipeline(ehrman_catalog()).await;
        let query = CatalogQuery::new("bart ehrman", 10);

        let first = search.search(&query).await;
        let calls = catalog.searches();
        let second = search.search(&CatalogQuery::new("  BART   Ehrman ", 10)).await;

        let asins = |books: &[BookRecord]| books.iter().filter_map(|b| b.asin.clone()).collect::<Vec<_>>();
        assert_eq!(asins(&first), asins(&second));
        assert_eq!(catalog.searches(), calls);
        let snapshot = search.cache().metrics().snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
    }

    #[tokio::test]
    async fn test_cache_key_includes_region_and_page() {
        let (search, catalog, _db) = pipeline(ehrman_catalog()).await;
        search.search(&CatalogQuery::new("bart ehrman", 10)).await;
        search.search(&CatalogQuery::new("bart ehrman", 10).region(Region::Uk)).await;
        search.search(&CatalogQuery::new("bart ehrman", 10).page(1)).await;
        assert_eq!(catalog.searches(), 9);
    }

    #[tokio::test]
    async fn test_rehydration_failure_recomputes() {
        let catalog = StubCatalog::new(BookSource::Audible)
            .with_asins("foo", &["A1"])
            .with_book("A1", audiobook("A1", "Foo", "Someone"));
        let (search, catalog, db) = pipeline(catalog).await;

        assert_eq!(search.search(&CatalogQuery::new("foo", 10)).await.len(), 1);
        assert!(db.delete_book("A1").await.unwrap());

        let books = search.search(&CatalogQuery::new("foo", 10)).await;
        assert_eq!(books.len(), 1);
        assert_eq!(catalog.searches(), 2);
        let snapshot = search.cache().metrics().snapshot();
        assert_eq!(snapshot.rehydration_failures, 1);
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.misses, 2);
    }

    #[tokio::test]
    async fn test_partial_rehydration_returns_survivors() {
        let (search, catalog, db) = pipeline(ehrman_catalog()).await;
        search.search(&CatalogQuery::new("bart ehrman", 10)).await;
        db.delete_book("A3").await.unwrap();

        let calls = catalog.searches();
        let books = search.search(&CatalogQuery::new("bart ehrman", 10)).await;
        let asins: Vec<_> = books.iter().filter_map(|b| b.asin.as_deref()).collect();
        assert_eq!(asins, vec!["A1", "A2"]);
        assert_eq!(catalog.searches(), calls);
    }

    #[tokio::test]
    async fn test_catalog_down_returns_empty() {
        let (search, catalog, _db) = pipeline(StubCatalog::down(BookSource::Audible)).await;

        assert!(search.search(&CatalogQuery::new("the anything", 10)).await.is_empty());
        // "the anything", "anything", "the", and the stop-word-filtered "anything"
        assert_eq!(catalog.searches(), 4);
        assert!(search.cache().is_empty());
    }

    #[tokio::test]
    async fn test_empty_result_not_cached() {
        let (search, catalog, _db) = pipeline(ehrman_catalog()).await;

        assert!(search.search(&CatalogQuery::new("nobody", 10)).await.is_empty());
        assert!(search.search(&CatalogQuery::new("nobody", 10)).await.is_empty());
        assert_eq!(catalog.searches(), 2);
        assert!(search.cache().is_empty());
    }

    #[tokio::test]
    async fn test_huge_result_count_saturates() {
        let (search, catalog, _db) = pipeline(ehrman_catalog()).await;

        let books = search.search(&CatalogQuery::new("bart ehrman", usize::MAX)).await;
        assert_eq!(books.len(), 3);
        let requested = catalog.requested.lock().unwrap();
        assert!(requested.iter().all(|q| q.max_results == MAX_RESULTS_PER_VARIANT));
    }

    #[tokio::test]
    async fn test_empty_query() {
        let (search, catalog, _db) = pipeline(ehrman_catalog()).await;
        assert!(search.search(&CatalogQuery::new("   ", 10)).await.is_empty());
        assert_eq!(catalog.searches(), 0);
    }

    #[tokio::test]
    async fn test_clear_old_book_caches() {
        let (search, _catalog, db) = pipeline(ehrman_catalog()).await;
        search.search(&CatalogQuery::new("bart ehrman", 10)).await;
        assert_eq!(search.cache().len(), 1);

        let long_ago = Utc::now() - TimeDelta::days(8);
        db.set_updated_at("A2", long_ago).await.unwrap();
        db.set_updated_at("A3", long_ago).await.unwrap();
        db.add_request("A3", "alice").await.unwrap();

        assert_eq!(search.clear_old_book_caches().await.unwrap(), 1);
        assert!(db.get_book("A2").await.unwrap().is_none());
        assert!(db.get_book("A3").await.unwrap().is_some());
        assert!(search.cache().is_empty());
    }
}
