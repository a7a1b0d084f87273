//! Shared services behind every tool call.

use std::sync::Arc;

use abr_client::{AudibleClient, GoogleBooksClient, HttpConfig, OpenLibraryClient};
use abr_core::{
    AppConfig, BookDb, BookSearch, BookSource, CatalogAdapter, InFlight, SearchCache, SuggestionProvider,
    SuggestionService, UnifiedSearch,
};

/// Long-lived state: one record store, one cache, one set of catalog clients.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: BookDb,
    pub search: UnifiedSearch,
    pub suggestions: SuggestionService,
    /// ASINs with a request currently being registered.
    pub in_flight: InFlight,
}

impl AppState {
    /// Open the record store and build catalog clients for every enabled source.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = BookDb::open(&config.db_path).await?;
        tracing::info!(path = %config.db_path.display(), "opened book database");

        let http = HttpConfig::new(config.timeout(), config.user_agent.clone());
        let audible = Arc::new(AudibleClient::new(&http)?);

        let mut auxiliary: Vec<Arc<dyn CatalogAdapter>> = Vec::new();
        if config.source_enabled(BookSource::GoogleBooks) {
            auxiliary.push(Arc::new(GoogleBooksClient::new(&http, config.google_books_api_key.clone())?));
        }
        if config.source_enabled(BookSource::OpenLibrary) {
            auxiliary.push(Arc::new(OpenLibraryClient::new(&http)?));
        }
        tracing::info!(sources = ?config.enabled_sources, "catalog clients ready");

        Ok(Self::new(config, db, audible.clone(), audible, auxiliary))
    }

    /// Assemble state from already-built parts.
    pub fn new(
        config: AppConfig, db: BookDb, primary: Arc<dyn CatalogAdapter>, suggestions: Arc<dyn SuggestionProvider>,
        auxiliary: Vec<Arc<dyn CatalogAdapter>>,
    ) -> Self {
        let cache = Arc::new(SearchCache::default());
        let book_search = BookSearch::new(primary, Arc::new(db.clone()), Arc::clone(&cache));
        Self {
            config,
            db,
            search: UnifiedSearch::new(book_search, auxiliary),
            suggestions: SuggestionService::new(suggestions, cache),
            in_flight: InFlight::new(),
        }
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        self.search.primary().cache()
    }
}
