//! Stub catalogs for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::Region;
use crate::book::{BookRecord, BookSource};
use crate::catalog::{CatalogAdapter, CatalogQuery, SuggestionProvider};

/// In-memory catalog that counts calls. A "down" stub answers nothing.
#[derive(Debug, Default)]
pub(crate) struct StubCatalog {
    source: BookSource,
    search_results: HashMap<String, Vec<BookRecord>>,
    books: HashMap<String, BookRecord>,
    down: bool,
    pub(crate) search_calls: AtomicUsize,
    pub(crate) fetch_calls: AtomicUsize,
    pub(crate) requested: Mutex<Vec<CatalogQuery>>,
}

impl StubCatalog {
    pub(crate) fn new(source: BookSource) -> Self {
        Self { source, ..Default::default() }
    }

    pub(crate) fn down(source: BookSource) -> Self {
        Self { down: true, ..Self::new(source) }
    }

    /// Answer `keywords` with `books`, in order.
    pub(crate) fn with_search(mut self, keywords: &str, books: Vec<BookRecord>) -> Self {
        self.search_results.insert(keywords.to_string(), books);
        self
    }

    /// Answer keyword `keywords` with ASIN-only partial records.
    pub(crate) fn with_asins(self, keywords: &str, asins: &[&str]) -> Self {
        let partial = asins.iter().map(|a| BookRecord::from_asin(*a)).collect();
        self.with_search(keywords, partial)
    }

    pub(crate) fn with_book(mut self, id: &str, book: BookRecord) -> Self {
        self.books.insert(id.to_string(), book);
        self
    }

    pub(crate) fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogAdapter for StubCatalog {
    fn source(&self) -> BookSource {
        self.source
    }

    async fn search_by_query(&self, query: &CatalogQuery) -> Vec<BookRecord> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(query.clone());
        }
        if self.down {
            return Vec::new();
        }
        let mut books = self.search_results.get(&query.keywords).cloned().unwrap_or_default();
        books.truncate(query.max_results);
        books
    }

    async fn fetch_by_identifier(&self, id: &str, _region: Region) -> Option<BookRecord> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.down {
            return None;
        }
        self.books.get(id).cloned()
    }
}

/// Suggestion stub; `None` entries simulate upstream failures.
#[derive(Debug, Default)]
pub(crate) struct StubSuggestions {
    answers: HashMap<String, Option<Vec<String>>>,
    pub(crate) calls: AtomicUsize,
}

impl StubSuggestions {
    pub(crate) fn with(mut self, query: &str, answer: Option<Vec<&str>>) -> Self {
        let answer = answer.map(|a| a.into_iter().map(String::from).collect());
        self.answers.insert(query.to_string(), answer);
        self
    }
}

#[async_trait]
impl SuggestionProvider for StubSuggestions {
    async fn suggestions(&self, query: &str, _region: Region) -> Option<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers.get(query).cloned().unwrap_or_else(|| Some(Vec::new()))
    }
}

/// A complete Audible-style record.
pub(crate) fn audiobook(asin: &str, title: &str, author: &str) -> BookRecord {
    BookRecord {
        asin: Some(asin.to_string()),
        authors: vec![author.to_string()],
        narrators: vec!["Narrator".to_string()],
        runtime_length_min: Some(600),
        ..BookRecord::new(title, BookSource::Audible)
    }
}
