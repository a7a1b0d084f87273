//! Search services built on the catalog, store, and cache contracts.
//!
//! - [`BookSearch`]: one catalog, with query expansion, rank merging, store
//!   reconciliation, and result caching
//! - [`UnifiedSearch`]: several catalogs merged by identifier, plus the
//!   author and hybrid variants
//! - [`SuggestionService`]: cached type-ahead suggestions

pub mod book_search;
pub mod expand;
pub mod merge;
pub mod rank;
pub mod suggest;
pub mod unified;

#[cfg(test)]
pub(crate) mod testing;

pub use book_search::{BookSearch, MAX_RESULTS_PER_VARIANT};
pub use expand::expand_query;
pub use merge::merge_by_identifier;
pub use rank::RankTracker;
pub use suggest::SuggestionService;
pub use unified::{HYBRID_FALLBACK_THRESHOLD, UnifiedSearch};
