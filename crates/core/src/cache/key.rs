//! Cache key fingerprints.

use sha2::{Digest, Sha256};

use crate::Region;

/// The inputs that make two searches interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchCacheKey {
    pub query: String,
    pub num_results: usize,
    pub page: usize,
    pub region: Region,
}

impl SearchCacheKey {
    /// Build a key, normalizing the query text.
    pub fn new(query: &str, num_results: usize, page: usize, region: Region) -> Self {
        Self { query: normalize_query(query), num_results, page, region }
    }

    /// SHA-256 fingerprint of the normalized parameters, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.query.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.num_results.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.page.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.region.code().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Lowercase and collapse internal whitespace.
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
