//! Best-rank tracking across query variants.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Seen {
    best_rank: usize,
    first_seen: usize,
}

/// Lowest rank index observed per identifier across every variant.
#[derive(Debug, Default)]
pub struct RankTracker {
    seen: HashMap<String, Seen>,
}

impl RankTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` appearing at position `rank` in some variant's results.
    pub fn observe(&mut self, id: &str, rank: usize) {
        let next = self.seen.len();
        self.seen
            .entry(id.to_string())
            .and_modify(|s| s.best_rank = s.best_rank.min(rank))
            .or_insert(Seen { best_rank: rank, first_seen: next });
    }

    pub fn best_rank(&self, id: &str) -> Option<usize> {
        self.seen.get(id).map(|s| s.best_rank)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.seen.keys()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Identifiers by best rank, ties broken by first-seen order.
    pub fn ranked(&self) -> Vec<String> {
        let mut ids: Vec<(&String, Seen)> = self.seen.iter().map(|(id, s)| (id, *s)).collect();
        ids.sort_by_key(|(_, s)| (s.best_rank, s.first_seen));
        ids.into_iter().map(|(id, _)| id.clone()).collect()
    }
}
