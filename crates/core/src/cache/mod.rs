//! In-memory, process-wide caches for search results and suggestions.
//!
//! Entries are immutable value projections keyed by a query fingerprint:
//!
//! - TTL of one week, checked lazily on read
//! - Opportunistic sweeps of expired entries after each write
//! - Invalidation by key, by book identifier, or wholesale
//! - Counters for hits, misses, evictions, and rehydration problems
//!
//! There is no background timer. Concurrent writers to the same key resolve
//! last-writer-wins; a lost update only costs a later miss.

pub mod key;
pub mod metrics;
pub mod search;

pub use key::{SearchCacheKey, normalize_query};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use search::{CacheHealth, CachedBook, SearchCache};

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

/// Refetch / cache lifetime: one week.
pub const REFETCH_TTL_SECS: i64 = 60 * 60 * 24 * 7;

/// A cached value and when it was computed.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    Fresh(CacheEntry<V>),
    /// The entry was past its TTL and has been removed.
    Expired,
    Missing,
}

/// String-keyed map with a fixed time-to-live per entry.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: TimeDelta,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: TimeDelta) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now - entry.fetched_at < self.ttl
    }

    /// Read an entry as of `now`, removing it if it has expired.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Lookup<V> {
        match self.entries.get(key) {
            None => return Lookup::Missing,
            Some(entry) if self.is_fresh(&entry, now) => return Lookup::Fresh(entry.clone()),
            Some(_) => {}
        }

        // a concurrent writer may have refreshed the entry since the read above
        match self.entries.remove_if(key, |_, entry| !self.is_fresh(entry, now)) {
            Some(_) => Lookup::Expired,
            None => match self.entries.get(key) {
                Some(entry) => Lookup::Fresh(entry.clone()),
                None => Lookup::Missing,
            },
        }
    }

    pub fn get(&self, key: &str) -> Lookup<V> {
        self.get_at(key, Utc::now())
    }

    /// Insert or replace an entry stamped with `now`.
    pub fn put_at(&self, key: impl Into<String>, value: V, now: DateTime<Utc>) {
        self.entries.insert(key.into(), CacheEntry { value, fetched_at: now });
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_at(key, value, Utc::now());
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Keep only entries for which `keep` returns true. Returns how many were removed.
    pub fn retain(&self, mut keep: impl FnMut(&CacheEntry<V>) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let kept = keep(entry);
            if !kept {
                removed += 1;
            }
            kept
        });
        removed
    }

    /// Remove every entry that has expired as of `now`.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        self.retain(|entry| now - entry.fetched_at < ttl)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold over current values without cloning them.
    pub fn fold<T>(&self, init: T, mut f: impl FnMut(T, &V) -> T) -> T {
        self.entries.iter().fold(init, |acc, entry| f(acc, &entry.value().value))
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(REFETCH_TTL_SECS))
    }
}
