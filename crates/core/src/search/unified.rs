//! Multi-catalog search: unified, author, and hybrid.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;

use super::book_search::{BookSearch, MAX_RESULTS_PER_VARIANT};
use super::merge::merge_by_identifier;
use crate::Region;
use crate::book::{BookRecord, BookSource};
use crate::catalog::{CatalogAdapter, CatalogQuery};
use crate::isbn::candidate_asins;

/// Below this many primary results, hybrid search consults auxiliary catalogs.
pub const HYBRID_FALLBACK_THRESHOLD: usize = 20;

/// Results requested from Google Books when hybrid search falls back.
const HYBRID_AUX_RESULTS: usize = 20;

/// Rows taken from the local store during hybrid search.
const HYBRID_LOCAL_RESULTS: usize = 20;

/// Fans a query out to the primary search pipeline and auxiliary catalogs.
#[derive(Clone)]
pub struct UnifiedSearch {
    primary: BookSearch,
    /// Auxiliary catalogs in merge priority order.
    auxiliary: Vec<Arc<dyn CatalogAdapter>>,
}

impl UnifiedSearch {
    pub fn new(primary: BookSearch, auxiliary: Vec<Arc<dyn CatalogAdapter>>) -> Self {
        Self { primary, auxiliary }
    }

    pub fn primary(&self) -> &BookSearch {
        &self.primary
    }

    fn auxiliary_for<'a>(&'a self, sources: &'a [BookSource]) -> impl Iterator<Item = &'a Arc<dyn CatalogAdapter>> {
        self.auxiliary.iter().filter(move |a| sources.contains(&a.source()))
    }

    fn auxiliary_source(&self, source: BookSource) -> Option<&Arc<dyn CatalogAdapter>> {
        self.auxiliary.iter().find(|a| a.source() == source)
    }

    /// Query every selected source concurrently and merge by identifier.
    ///
    /// Audible results come from the full single-catalog pipeline. A source
    /// that fails contributes nothing; if all fail the result is empty.
    pub async fn unified_search(
        &self, query: &str, num_results: usize, sources: &[BookSource], region: Region,
    ) -> Vec<BookRecord> {
        let query = query.trim();
        if query.is_empty() || num_results == 0 {
            return Vec::new();
        }

        let primary = async {
            if sources.contains(&BookSource::Audible) {
                self.primary.search(&CatalogQuery::new(query, num_results).region(region)).await
            } else {
                Vec::new()
            }
        };
        let aux_query = CatalogQuery::new(query, num_results).region(region);
        let auxiliary = join_all(self.auxiliary_for(sources).map(|a| a.search_by_query(&aux_query)));

        let (primary, auxiliary) = tokio::join!(primary, auxiliary);
        tracing::debug!(
            primary = primary.len(),
            auxiliary = auxiliary.iter().map(Vec::len).sum::<usize>(),
            "unified search sources returned"
        );

        let merged = merge_by_identifier(std::iter::once(primary).chain(auxiliary), num_results);
        tracing::info!(query, count = merged.len(), "unified search complete");
        merged
    }

    /// Find books by an author across the selected sources.
    ///
    /// The Audible leg is a keyword search on the name in `region`, capped at 50 results.
    pub async fn search_author(
        &self, author: &str, num_results: usize, sources: &[BookSource], region: Region,
    ) -> Vec<BookRecord> {
        let author = author.trim();
        if author.is_empty() || num_results == 0 {
            return Vec::new();
        }

        let primary = async {
            if sources.contains(&BookSource::Audible) {
                let capped = num_results.min(MAX_RESULTS_PER_VARIANT);
                self.primary.search(&CatalogQuery::new(author, capped).region(region)).await
            } else {
                Vec::new()
            }
        };
        let auxiliary = join_all(self.auxiliary_for(sources).map(|a| a.search_by_author(author, num_results)));

        let (primary, auxiliary) = tokio::join!(primary, auxiliary);
        let merged = merge_by_identifier(std::iter::once(primary).chain(auxiliary), num_results);
        tracing::info!(author, %region, count = merged.len(), "author search complete");
        merged
    }

    /// Audible search, topped up from Google Books and the local store when thin.
    ///
    /// Google Books ISBNs are tried as Audible ASINs; hits carry the Google
    /// identifiers and are stored. Results are deduplicated by ASIN with
    /// priority primary, then Google-enriched, then local.
    pub async fn hybrid_search(&self, query: &str, num_results: usize, region: Region) -> Vec<BookRecord> {
        let query = query.trim();
        if query.is_empty() || num_results == 0 {
            return Vec::new();
        }

        let primary = self.primary.search(&CatalogQuery::new(query, num_results).region(region)).await;
        if primary.len() >= HYBRID_FALLBACK_THRESHOLD {
            tracing::info!(query, count = primary.len(), "primary results sufficient; skipping fallback");
            return primary;
        }

        let enriched = self.enrich_from_google(query, region).await;

        let local = match self.primary.store().search_local(query, HYBRID_LOCAL_RESULTS).await {
            Ok(books) => books,
            Err(e) => {
                tracing::error!(error = %e, "local book search failed");
                Vec::new()
            }
        };

        let (primary_count, enriched_count, local_count) = (primary.len(), enriched.len(), local.len());
        let mut seen = HashSet::new();
        let results: Vec<BookRecord> = primary
            .into_iter()
            .chain(enriched)
            .chain(local)
            .filter(|b| seen.insert(b.asin.clone().unwrap_or_else(|| b.dedup_key())))
            .take(num_results)
            .collect();

        tracing::info!(
            query,
            primary = primary_count,
            enriched = enriched_count,
            local = local_count,
            count = results.len(),
            "hybrid search complete"
        );
        results
    }

    /// Resolve Google Books hits against Audible by treating their ISBNs as ASINs.
    async fn enrich_from_google(&self, query: &str, region: Region) -> Vec<BookRecord> {
        let Some(google) = self.auxiliary_source(BookSource::GoogleBooks) else {
            return Vec::new();
        };
        let volumes = google.search_by_query(&CatalogQuery::new(query, HYBRID_AUX_RESULTS)).await;

        let catalog = self.primary.catalog();
        let lookups = volumes.iter().map(|volume| async move {
            for candidate in candidate_asins(volume.isbn_10.as_deref(), volume.isbn_13.as_deref()) {
                if let Some(mut book) = catalog.fetch_by_identifier(&candidate, region).await {
                    tracing::debug!(isbn = %candidate, title = %book.title, "found audiobook via Google Books ISBN");
                    book.isbn_10 = volume.isbn_10.clone();
                    book.isbn_13 = volume.isbn_13.clone();
                    book.external_id = volume.external_id.clone();
                    book.source = BookSource::GoogleBooksHybrid;
                    return Some(book);
                }
            }
            None
        });
        let enriched: Vec<BookRecord> = join_all(lookups).await.into_iter().flatten().collect();

        if !enriched.is_empty()
            && let Err(e) = self.primary.store().upsert_many(&enriched).await
        {
            tracing::error!(count = enriched.len(), error = %e, "failed to store enriched books");
        }
        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SearchCache;
    use crate::search::testing::{StubCatalog, audiobook};
    use crate::store::BookDb;

    const ALL: [BookSource; 3] = [BookSource::Audible, BookSource::GoogleBooks, BookSource::OpenLibrary];

    fn volume(source: BookSource, title: &str, isbn_10: Option<&str>, isbn_13: Option<&str>) -> BookRecord {
        BookRecord {
            isbn_10: isbn_10.map(String::from),
            isbn_13: isbn_13.map(String::from),
            external_id: Some(format!("{source}-{title}")),
            authors: vec!["Bart D. Ehrman".into()],
            ..BookRecord::new(title, source)
        }
    }

    async fn unified(audible: StubCatalog, google: StubCatalog, openlibrary: StubCatalog) -> (UnifiedSearch, BookDb) {
        let db = BookDb::open_in_memory().await.unwrap();
        let primary = BookSearch::new(Arc::new(audible), Arc::new(db.clone()), Arc::new(SearchCache::default()));
        let auxiliary: Vec<Arc<dyn CatalogAdapter>> = vec![Arc::new(google), Arc::new(openlibrary)];
        (UnifiedSearch::new(primary, auxiliary), db)
    }

    #[tokio::test]
    async fn test_all_sources_down() {
        let (search, _db) = unified(
            StubCatalog::down(BookSource::Audible),
            StubCatalog::down(BookSource::GoogleBooks),
            StubCatalog::down(BookSource::OpenLibrary),
        )
        .await;

        assert!(search.unified_search("anything", 10, &ALL, Region::Us).await.is_empty());
        assert!(search.search_author("anyone", 10, &ALL, Region::Us).await.is_empty());
        assert!(search.hybrid_search("anything", 10, Region::Us).await.is_empty());
    }

    #[tokio::test]
    async fn test_unified_merges_across_sources() {
        let audible = StubCatalog::new(BookSource::Audible).with_asins("dune", &["B0DUNE0000"]).with_book(
            "B0DUNE0000",
            BookRecord { isbn_13: Some("9780441013593".into()), ..audiobook("B0DUNE0000", "Dune", "Frank Herbert") },
        );
        let google = StubCatalog::new(BookSource::GoogleBooks).with_search(
            "dune",
            vec![
                BookRecord {
                    subtitle: Some("Deluxe Edition".into()),
                    ..volume(BookSource::GoogleBooks, "Dune (Google)", None, Some("9780441013593"))
                },
                volume(BookSource::GoogleBooks, "Dune Messiah", Some("0441172695"), None),
            ],
        );
        let openlibrary = StubCatalog::new(BookSource::OpenLibrary)
            .with_search("dune", vec![volume(BookSource::OpenLibrary, "Untracked", None, None)]);
        let (search, _db) = unified(audible, google, openlibrary).await;

        let books = search.unified_search("dune", 10, &ALL, Region::Us).await;
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Dune Messiah"]);
        assert_eq!(books[0].subtitle.as_deref(), Some("Deluxe Edition"));
        assert_eq!(books[0].source, BookSource::Hybrid);
    }

    #[tokio::test]
    async fn test_unified_respects_selected_sources() {
        let audible = StubCatalog::new(BookSource::Audible).with_asins("dune", &["B0DUNE0000"]);
        let google = StubCatalog::new(BookSource::GoogleBooks)
            .with_search("dune", vec![volume(BookSource::GoogleBooks, "Dune", None, Some("9780441013593"))]);
        let (search, _db) = unified(audible, google, StubCatalog::new(BookSource::OpenLibrary)).await;

        let books = search.unified_search("dune", 10, &[BookSource::GoogleBooks], Region::Us).await;
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].source, BookSource::GoogleBooks);
        assert_eq!(search.primary().cache().metrics().snapshot().misses, 0);
    }

    #[tokio::test]
    async fn test_hybrid_enriches_from_google_isbn() {
        let audible = StubCatalog::new(BookSource::Audible)
            .with_asins("bart ehrman", &["A1"])
            .with_book("A1", audiobook("A1", "Misquoting Jesus", "Bart D. Ehrman"))
            .with_book("1797101021", audiobook("1797101021", "Heaven and Hell", "Bart D. Ehrman"));
        let google = StubCatalog::new(BookSource::GoogleBooks).with_search(
            "bart ehrman",
            vec![
                volume(BookSource::GoogleBooks, "Heaven and Hell", Some("1797101021"), Some("9781797101026")),
                volume(BookSource::GoogleBooks, "No Audiobook", Some("0306406152"), None),
            ],
        );
        let (search, db) = unified(audible, google, StubCatalog::new(BookSource::OpenLibrary)).await;

        let books = search.hybrid_search("bart ehrman", 10, Region::Us).await;
        let asins: Vec<_> = books.iter().filter_map(|b| b.asin.as_deref()).collect();
        assert_eq!(asins, vec!["A1", "1797101021"]);

        let enriched = &books[1];
        assert_eq!(enriched.source, BookSource::GoogleBooksHybrid);
        assert_eq!(enriched.isbn_13.as_deref(), Some("9781797101026"));
        assert_eq!(enriched.external_id.as_deref(), Some("google_books-Heaven and Hell"));

        let stored = db.get_book("1797101021").await.unwrap().unwrap();
        assert_eq!(stored.isbn_13.as_deref(), Some("9781797101026"));
    }

    #[tokio::test]
    async fn test_hybrid_includes_local_matches() {
        let (search, db) = unified(
            StubCatalog::new(BookSource::Audible),
            StubCatalog::new(BookSource::GoogleBooks),
            StubCatalog::new(BookSource::OpenLibrary),
        )
        .await;
        db.upsert_books(&[audiobook("B0LOCAL000", "Jesus, Interrupted", "Bart D. Ehrman")])
            .await
            .unwrap();

        let books = search.hybrid_search("ehrman", 10, Region::Us).await;
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].asin.as_deref(), Some("B0LOCAL000"));
    }

    #[tokio::test]
    async fn test_hybrid_skips_fallback_when_sufficient() {
        let asins: Vec<String> = (0..25).map(|i| format!("A{i:02}")).collect();
        let refs: Vec<&str> = asins.iter().map(String::as_str).collect();
        let mut audible = StubCatalog::new(BookSource::Audible).with_asins("history", &refs);
        for asin in &asins {
            audible = audible.with_book(asin, audiobook(asin, asin, "Historian"));
        }
        let google = Arc::new(StubCatalog::new(BookSource::GoogleBooks));

        let db = BookDb::open_in_memory().await.unwrap();
        let primary = BookSearch::new(Arc::new(audible), Arc::new(db), Arc::new(SearchCache::default()));
        let auxiliary: Arc<dyn CatalogAdapter> = google.clone();
        let search = UnifiedSearch::new(primary, vec![auxiliary]);

        let books = search.hybrid_search("history", 25, Region::Us).await;
        assert_eq!(books.len(), 25);
        assert_eq!(google.searches(), 0);
    }

    #[tokio::test]
    async fn test_author_search_merges() {
        let google = StubCatalog::new(BookSource::GoogleBooks).with_search(
            "Frank Herbert",
            vec![volume(BookSource::GoogleBooks, "Dune", None, Some("9780441013593"))],
        );
        let openlibrary = StubCatalog::new(BookSource::OpenLibrary).with_search(
            "Frank Herbert",
            vec![
                volume(BookSource::OpenLibrary, "Dune", Some("0441013597"), None),
                volume(BookSource::OpenLibrary, "Children of Dune", None, Some("9780593098240")),
            ],
        );
        let (search, _db) = unified(StubCatalog::new(BookSource::Audible), google, openlibrary).await;

        let books = search.search_author(" Frank Herbert ", 10, &ALL, Region::Us).await;
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Children of Dune"]);
        assert_eq!(books[0].isbn_10.as_deref(), Some("0441013597"));
    }

    #[tokio::test]
    async fn test_author_search_uses_region() {
        let audible = StubCatalog::new(BookSource::Audible)
            .with_asins("Frank Herbert", &["B0DUNE0000"])
            .with_book("B0DUNE0000", audiobook("B0DUNE0000", "Dune", "Frank Herbert"));
        let audible = Arc::new(audible);
        let db = BookDb::open_in_memory().await.unwrap();
        let primary = BookSearch::new(audible.clone(), Arc::new(db), Arc::new(SearchCache::default()));
        let search = UnifiedSearch::new(primary, Vec::new());

        let books = search.search_author("Frank Herbert", 10, &ALL, Region::Uk).await;
        assert_eq!(books.len(), 1);

        let requested = audible.requested.lock().unwrap();
        assert!(!requested.is_empty());
        assert!(requested.iter().all(|q| q.region == Region::Uk));
    }

    #[tokio::test]
    async fn test_hybrid_dedup_prefers_primary() {
        let audible = StubCatalog::new(BookSource::Audible)
            .with_asins("ehrman", &["1797101021"])
            .with_book("1797101021", audiobook("1797101021", "Heaven and Hell", "Bart D. Ehrman"));
        let google_copy =
            volume(BookSource::GoogleBooks, "Heaven and Hell (Google)", Some("1797101021"), Some("9781797101026"));
        let google = StubCatalog::new(BookSource::GoogleBooks).with_search("ehrman", vec![google_copy]);
        let (search, db) = unified(audible, google, StubCatalog::new(BookSource::OpenLibrary)).await;
        db.upsert_books(&[audiobook("B0LOCAL000", "Jesus, Interrupted", "Bart D. Ehrman")])
            .await
            .unwrap();

        let books = search.hybrid_search("ehrman", 10, Region::Us).await;
        let asins: Vec<_> = books.iter().filter_map(|b| b.asin.as_deref()).collect();
        assert_eq!(asins, vec!["1797101021", "B0LOCAL000"]);

        let primary = &books[0];
        assert_eq!(primary.title, "Heaven and Hell");
        assert_eq!(primary.source, BookSource::Audible);
        assert_eq!(primary.narrators, vec!["Narrator".to_string()]);
        assert!(primary.isbn_13.is_none());

        // the enriched copy was still stored, so local search saw it too
        let stored = db.get_book("1797101021").await.unwrap().unwrap();
        assert_eq!(stored.isbn_13.as_deref(), Some("9781797101026"));
    }
}
