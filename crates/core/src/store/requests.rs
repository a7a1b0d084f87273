//! User requests for books.
//!
//! A requested book is pinned: garbage collection never deletes it.

use chrono::Utc;
use tokio_rusqlite::params;

use super::books::encode_ts;
use super::connection::BookDb;
use crate::Error;

impl BookDb {
    /// Record that `username` wants `asin`. Repeated requests are ignored.
    ///
    /// The book must already be stored.
    pub async fn add_request(&self, asin: &str, username: &str) -> Result<bool, Error> {
        let (asin, username) = (asin.to_string(), username.to_string());
        let requested_at = encode_ts(Utc::now());
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO book_requests (asin, username, requested_at) VALUES (?1, ?2, ?3)",
                    params![asin, username, requested_at],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn remove_request(&self, asin: &str, username: &str) -> Result<bool, Error> {
        let (asin, username) = (asin.to_string(), username.to_string());
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let removed = conn.execute(
                    "DELETE FROM book_requests WHERE asin = ?1 AND username = ?2",
                    params![asin, username],
                )?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of distinct users who requested `asin`.
    pub async fn request_count(&self, asin: &str) -> Result<u64, Error> {
        let asin = asin.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM book_requests WHERE asin = ?1", params![asin], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
