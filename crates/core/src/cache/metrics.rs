//! Search cache counters.
//!
//! Every counter is monotonic between resets and updated with relaxed atomics,
//! so recording never blocks or fails the caller.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Hit/miss/eviction/error counters for the search cache.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    rehydration_failures: AtomicU64,
    staleness_errors: AtomicU64,
    /// Unix seconds of the last reset; 0 when never reset.
    last_reset: AtomicI64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub rehydration_failures: u64,
    pub staleness_errors: u64,
}

impl MetricsSnapshot {
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate as a percentage; 0.0 before any access.
    pub fn hit_rate(&self) -> f64 {
        match self.total_accesses() {
            0 => 0.0,
            total => self.hits as f64 / total as f64 * 100.0,
        }
    }
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Cached identifiers no longer resolve against the store.
    pub fn record_rehydration_failure(&self) {
        self.rehydration_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// The store failed while rehydrating a cached entry.
    pub fn record_staleness_error(&self) {
        self.staleness_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rehydration_failures: self.rehydration_failures.load(Ordering::Relaxed),
            staleness_errors: self.staleness_errors.load(Ordering::Relaxed),
        }
    }

    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Time of the last [`reset`](Self::reset), if any.
    pub fn last_reset(&self) -> Option<DateTime<Utc>> {
        match self.last_reset.load(Ordering::Relaxed) {
            0 => None,
            secs => DateTime::from_timestamp(secs, 0),
        }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.rehydration_failures.store(0, Ordering::Relaxed);
        self.staleness_errors.store(0, Ordering::Relaxed);
        self.last_reset.store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            total_accesses = snapshot.total_accesses(),
            hits = snapshot.hits,
            misses = snapshot.misses,
            hit_rate = %format!("{:.1}%", snapshot.hit_rate()),
            evictions = snapshot.evictions,
            rehydration_failures = snapshot.rehydration_failures,
            staleness_errors = snapshot.staleness_errors,
            "cache metrics summary"
        );
    }
}
