//! Record store: persisted book records keyed by ASIN.
//!
//! The search pipeline only sees the [`RecordStore`] trait. [`BookDb`] is the
//! SQLite implementation, running queries on tokio-rusqlite's background
//! thread.

mod books;
mod connection;
mod migrations;
mod requests;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Error;
use crate::book::BookRecord;

pub use connection::BookDb;

/// Read/write contract the search pipeline depends on.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_by_identifier(&self, asin: &str) -> Result<Option<BookRecord>, Error>;

    /// Batch lookup; identifiers that are not stored are absent from the map.
    async fn get_many_by_identifiers(&self, asins: &HashSet<String>) -> Result<HashMap<String, BookRecord>, Error>;

    /// Insert-or-update. Must be safe when two callers write the same new ASIN at once.
    async fn upsert_many(&self, books: &[BookRecord]) -> Result<(), Error>;

    /// Delete unrequested, undownloaded records not refreshed since `older_than`.
    async fn delete_stale_unreferenced(&self, older_than: DateTime<Utc>) -> Result<Vec<String>, Error>;

    /// Substring match against stored records.
    async fn search_local(&self, query: &str, limit: usize) -> Result<Vec<BookRecord>, Error>;
}

#[async_trait]
impl RecordStore for BookDb {
    async fn get_by_identifier(&self, asin: &str) -> Result<Option<BookRecord>, Error> {
        self.get_book(asin).await
    }

    async fn get_many_by_identifiers(&self, asins: &HashSet<String>) -> Result<HashMap<String, BookRecord>, Error> {
        self.get_books(asins).await
    }

    async fn upsert_many(&self, books: &[BookRecord]) -> Result<(), Error> {
        let written = self.upsert_books(books).await?;
        tracing::debug!(count = written, "upserted books");
        Ok(())
    }

    async fn delete_stale_unreferenced(&self, older_than: DateTime<Utc>) -> Result<Vec<String>, Error> {
        self.delete_stale_books(older_than).await
    }

    async fn search_local(&self, query: &str, limit: usize) -> Result<Vec<BookRecord>, Error> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        self.search_books(query, limit).await
    }
}
