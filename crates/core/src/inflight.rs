//! Guard against duplicate concurrent work per identifier.
//!
//! Used to keep two download-source queries for the same book from running
//! at once. The identifier is released when the guard drops, including on
//! early return or error.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared set of identifiers currently being worked on.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<String>>>,
}

/// Holds an identifier in the [`InFlight`] set until dropped.
#[derive(Debug)]
#[must_use = "the identifier is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // the set holds plain strings, so a poisoned lock is still consistent
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `id`, or `None` if another caller already holds it.
    pub fn try_acquire(&self, id: &str) -> Option<InFlightGuard> {
        if !self.lock().insert(id.to_string()) {
            tracing::debug!(id, "identifier already in flight");
            return None;
        }
        Some(InFlightGuard { ids: Arc::clone(&self.ids), id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl InFlightGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut ids = self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.remove(&self.id);
    }
}
