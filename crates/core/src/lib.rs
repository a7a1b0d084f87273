//! Core types and the search pipeline for abr.
//!
//! This crate provides:
//! - Canonical book records and identifier utilities
//! - Catalog adapter and record store contracts
//! - SQLite record store
//! - Search result cache with metrics
//! - Single-catalog, unified, hybrid, and suggestion search services
//! - Unified error types and configuration

pub mod book;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod inflight;
pub mod isbn;
pub mod region;
pub mod search;
pub mod store;

pub use book::{BookRecord, BookSource};
pub use cache::{CacheHealth, CacheMetrics, SearchCache};
pub use catalog::{CatalogAdapter, CatalogQuery, SuggestionProvider};
pub use config::AppConfig;
pub use error::Error;
pub use inflight::{InFlight, InFlightGuard};
pub use region::Region;
pub use search::{BookSearch, SuggestionService, UnifiedSearch};
pub use store::{BookDb, RecordStore};
