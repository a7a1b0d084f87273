//! Cached type-ahead suggestions.

use std::sync::Arc;

use crate::Region;
use crate::cache::SearchCache;
use crate::catalog::SuggestionProvider;

#[derive(Clone)]
pub struct SuggestionService {
    provider: Arc<dyn SuggestionProvider>,
    cache: Arc<SearchCache>,
}

impl SuggestionService {
    pub fn new(provider: Arc<dyn SuggestionProvider>, cache: Arc<SearchCache>) -> Self {
        Self { provider, cache }
    }

    /// Suggestions for a partial query. Upstream failures yield an empty list and are not cached.
    pub async fn suggest(&self, query: &str, region: Region) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        // Suggestions differ per marketplace.
        let key = format!("{region}:{query}");
        if let Some(cached) = self.cache.get_suggestions(&key) {
            return cached;
        }

        match self.provider.suggestions(query, region).await {
            Some(suggestions) => {
                self.cache.put_suggestions(&key, suggestions.clone());
                suggestions
            }
            None => Vec::new(),
        }
    }
}
