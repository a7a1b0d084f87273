//! Search result and suggestion caches.
//!
//! Search entries hold [`CachedBook`] projections, never store handles. A
//! cached entry stays readable after the books it names are deleted; callers
//! re-resolve identifiers against the record store on read.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::key::SearchCacheKey;
use super::metrics::CacheMetrics;
use super::{CacheEntry, Lookup, REFETCH_TTL_SECS, TtlCache};
use crate::book::{BookRecord, BookSource};

/// Immutable projection of a search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedBook {
    pub asin: Option<String>,
    pub isbn_13: Option<String>,
    pub title: String,
    pub authors: Vec<String>,
    pub source: BookSource,
}

impl From<&BookRecord> for CachedBook {
    fn from(book: &BookRecord) -> Self {
        Self {
            asin: book.asin.clone(),
            isbn_13: book.isbn_13.clone(),
            title: book.title.clone(),
            authors: book.authors.clone(),
            source: book.source,
        }
    }
}

impl CachedBook {
    fn references(&self, identifier: &str) -> bool {
        self.asin.as_deref() == Some(identifier) || self.isbn_13.as_deref() == Some(identifier)
    }
}

/// Read-only snapshot backing the administrative health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CacheHealth {
    /// Number of cached searches.
    pub cache_size: usize,
    /// Number of book projections across all cached searches.
    pub total_entries: usize,
    /// Number of cached suggestion lists.
    pub suggestion_entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Percentage, 0.0 before any access.
    pub hit_rate: f64,
    pub evictions: u64,
    pub rehydration_failures: u64,
    pub staleness_errors: u64,
    /// RFC 3339 time the counters were last zeroed; absent since startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_reset_at: Option<String>,
}

/// Process-wide search cache. Construct once and share behind an `Arc`.
#[derive(Debug)]
pub struct SearchCache {
    results: TtlCache<Vec<CachedBook>>,
    suggestions: TtlCache<Vec<String>>,
    metrics: Arc<CacheMetrics>,
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(Arc::new(CacheMetrics::new()))
    }
}

impl SearchCache {
    pub fn new(metrics: Arc<CacheMetrics>) -> Self {
        Self::with_ttl(TimeDelta::seconds(REFETCH_TTL_SECS), metrics)
    }

    pub fn with_ttl(ttl: TimeDelta, metrics: Arc<CacheMetrics>) -> Self {
        Self { results: TtlCache::new(ttl), suggestions: TtlCache::new(ttl), metrics }
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    /// Look up a search as of `now`. Expired entries are evicted and reported as absent.
    pub fn get_at(&self, key: &SearchCacheKey, now: DateTime<Utc>) -> Option<CacheEntry<Vec<CachedBook>>> {
        match self.results.get_at(&key.fingerprint(), now) {
            Lookup::Fresh(entry) => Some(entry),
            Lookup::Expired => {
                self.metrics.record_eviction();
                None
            }
            Lookup::Missing => None,
        }
    }

    pub fn get(&self, key: &SearchCacheKey) -> Option<CacheEntry<Vec<CachedBook>>> {
        self.get_at(key, Utc::now())
    }

    /// Store the ranked result of a search, replacing any previous entry.
    ///
    /// Records without an identifier are left out of the projection.
    pub fn put_at(&self, key: &SearchCacheKey, books: &[BookRecord], now: DateTime<Utc>) {
        let projections = books
            .iter()
            .filter(|b| b.has_identifier())
            .map(CachedBook::from)
            .collect();
        self.results.put_at(key.fingerprint(), projections, now);
    }

    pub fn put(&self, key: &SearchCacheKey, books: &[BookRecord]) {
        self.put_at(key, books, Utc::now());
    }

    pub fn invalidate(&self, key: &SearchCacheKey) -> bool {
        self.results.remove(&key.fingerprint())
    }

    /// Drop every cached search (and suggestion list).
    pub fn invalidate_all(&self) {
        self.results.clear();
        self.suggestions.clear();
        tracing::info!("invalidated all search caches");
    }

    /// Drop every cached search whose results reference `identifier` (ASIN or ISBN-13).
    pub fn invalidate_by_identifier(&self, identifier: &str) -> usize {
        if identifier.is_empty() {
            return 0;
        }
        let removed = self
            .results
            .retain(|entry| !entry.value.iter().any(|b| b.references(identifier)));
        if removed > 0 {
            tracing::debug!(identifier, removed, "invalidated search cache entries");
        }
        removed
    }

    /// Evict expired search and suggestion entries, counting them as evictions.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let evicted = self.results.sweep_expired(now) + self.suggestions.sweep_expired(now);
        if evicted > 0 {
            self.metrics.record_evictions(evicted as u64);
        }
        evicted
    }

    pub fn get_suggestions_at(&self, query: &str, now: DateTime<Utc>) -> Option<Vec<String>> {
        match self.suggestions.get_at(query, now) {
            Lookup::Fresh(entry) => Some(entry.value),
            Lookup::Expired | Lookup::Missing => None,
        }
    }

    pub fn get_suggestions(&self, query: &str) -> Option<Vec<String>> {
        self.get_suggestions_at(query, Utc::now())
    }

    pub fn put_suggestions_at(&self, query: &str, suggestions: Vec<String>, now: DateTime<Utc>) {
        self.suggestions.put_at(query, suggestions, now);
    }

    pub fn put_suggestions(&self, query: &str, suggestions: Vec<String>) {
        self.put_suggestions_at(query, suggestions, Utc::now());
    }

    /// Number of cached searches.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn health(&self) -> CacheHealth {
        let snapshot = self.metrics.snapshot();
        CacheHealth {
            cache_size: self.results.len(),
            total_entries: self.results.fold(0, |acc, books| acc + books.len()),
            suggestion_entries: self.suggestions.len(),
            hits: snapshot.hits,
            misses: snapshot.misses,
            hit_rate: snapshot.hit_rate(),
            evictions: snapshot.evictions,
            rehydration_failures: snapshot.rehydration_failures,
            staleness_errors: snapshot.staleness_errors,
            metrics_reset_at: self.metrics.last_reset().map(|at| at.to_rfc3339()),
        }
    }
}
