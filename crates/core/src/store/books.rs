//! Book record persistence.
//!
//! Books are keyed by ASIN; records without one are never written. Writes use
//! `ON CONFLICT(asin)` so two searches discovering the same new book at the
//! same time cannot create duplicates.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row, params_from_iter};

use super::connection::BookDb;
use crate::Error;
use crate::book::{BookRecord, BookSource};

const COLUMNS: &str = "asin, title, subtitle, authors_json, narrators_json, cover_image, release_date, \
                       runtime_length_min, isbn_10, isbn_13, external_id, source, downloaded, updated_at";

/// Keeps `IN (...)` lists under SQLite's bound-parameter limit.
const MAX_IN_PARAMS: usize = 500;

/// Fixed-width timestamps so text comparison matches chronological order.
pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Serialization(format!("bad timestamp {raw:?}: {e}")))
}

/// Raw column values, decoded into a [`BookRecord`] outside the row callback.
struct BookRow {
    asin: String,
    title: String,
    subtitle: Option<String>,
    authors_json: String,
    narrators_json: String,
    cover_image: Option<String>,
    release_date: Option<String>,
    runtime_length_min: Option<i64>,
    isbn_10: Option<String>,
    isbn_13: Option<String>,
    external_id: Option<String>,
    source: String,
    downloaded: bool,
    updated_at: String,
}

impl BookRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            asin: row.get(0)?,
            title: row.get(1)?,
            subtitle: row.get(2)?,
            authors_json: row.get(3)?,
            narrators_json: row.get(4)?,
            cover_image: row.get(5)?,
            release_date: row.get(6)?,
            runtime_length_min: row.get(7)?,
            isbn_10: row.get(8)?,
            isbn_13: row.get(9)?,
            external_id: row.get(10)?,
            source: row.get(11)?,
            downloaded: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

impl TryFrom<BookRow> for BookRecord {
    type Error = Error;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let release_date = row
            .release_date
            .as_deref()
            .map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
            .transpose()
            .map_err(|e| Error::Serialization(format!("bad release date for {}: {e}", row.asin)))?;

        Ok(BookRecord {
            asin: Some(row.asin),
            isbn_10: row.isbn_10,
            isbn_13: row.isbn_13,
            external_id: row.external_id,
            title: row.title,
            subtitle: row.subtitle,
            authors: serde_json::from_str(&row.authors_json)?,
            narrators: serde_json::from_str(&row.narrators_json)?,
            cover_image: row.cover_image,
            release_date,
            runtime_length_min: row.runtime_length_min.and_then(|m| u32::try_from(m).ok()),
            source: row.source.parse().unwrap_or(BookSource::Audible),
            downloaded: row.downloaded,
            updated_at: decode_ts(&row.updated_at)?,
        })
    }
}

/// Column values for one insert, encoded ahead of the blocking call.
struct EncodedBook {
    asin: String,
    title: String,
    subtitle: Option<String>,
    authors_json: String,
    narrators_json: String,
    cover_image: Option<String>,
    release_date: Option<String>,
    runtime_length_min: Option<u32>,
    isbn_10: Option<String>,
    isbn_13: Option<String>,
    external_id: Option<String>,
    source: &'static str,
    downloaded: bool,
}

impl EncodedBook {
    fn encode(book: &BookRecord) -> Result<Option<Self>, Error> {
        let Some(asin) = book.asin.clone() else {
            return Ok(None);
        };
        Ok(Some(Self {
            asin,
            title: book.title.clone(),
            subtitle: book.subtitle.clone(),
            authors_json: serde_json::to_string(&book.authors)?,
            narrators_json: serde_json::to_string(&book.narrators)?,
            cover_image: book.cover_image.clone(),
            release_date: book.release_date.map(|d| d.format("%Y-%m-%d").to_string()),
            runtime_length_min: book.runtime_length_min,
            isbn_10: book.isbn_10.clone(),
            isbn_13: book.isbn_13.clone(),
            external_id: book.external_id.clone(),
            source: book.source.as_str(),
            downloaded: book.downloaded,
        }))
    }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl BookDb {
    /// Fetch a single book by ASIN.
    pub async fn get_book(&self, asin: &str) -> Result<Option<BookRecord>, Error> {
        let asin = asin.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<BookRow>, Error> {
                let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM books WHERE asin = ?1"))?;
                Ok(stmt.query_row(params![asin], BookRow::from_row).optional()?)
            })
            .await
            .map_err(Error::from)?;

        row.map(BookRecord::try_from).transpose()
    }

    /// Fetch every stored book among `asins`, keyed by ASIN.
    pub async fn get_books(&self, asins: &HashSet<String>) -> Result<HashMap<String, BookRecord>, Error> {
        if asins.is_empty() {
            return Ok(HashMap::new());
        }

        let asins: Vec<String> = asins.iter().cloned().collect();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<BookRow>, Error> {
                let mut rows = Vec::with_capacity(asins.len());
                for chunk in asins.chunks(MAX_IN_PARAMS) {
                    let placeholders = vec!["?"; chunk.len()].join(", ");
                    let mut stmt =
                        conn.prepare(&format!("SELECT {COLUMNS} FROM books WHERE asin IN ({placeholders})"))?;
                    let mapped = stmt.query_map(params_from_iter(chunk.iter()), BookRow::from_row)?;
                    for row in mapped {
                        rows.push(row?);
                    }
                }
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|row| {
                let book = BookRecord::try_from(row)?;
                Ok((book.asin.clone().unwrap_or_default(), book))
            })
            .collect()
    }

    /// Insert new books and refresh existing ones in a single transaction.
    ///
    /// On conflict, descriptive fields are refreshed but never cleared by an
    /// empty incoming value; alternate identifiers are only filled when
    /// missing; `downloaded` and `source` are left alone. Books without an
    /// ASIN are skipped. Returns the number of rows written.
    pub async fn upsert_books(&self, books: &[BookRecord]) -> Result<usize, Error> {
        let encoded: Vec<EncodedBook> = books
            .iter()
            .map(EncodedBook::encode)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();
        if encoded.is_empty() {
            return Ok(0);
        }

        let updated_at = encode_ts(Utc::now());
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                let mut written = 0;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO books (
                            asin, title, subtitle, authors_json, narrators_json, cover_image, release_date,
                            runtime_length_min, isbn_10, isbn_13, external_id, source, downloaded, updated_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                        ON CONFLICT(asin) DO UPDATE SET
                            title = CASE WHEN excluded.title = '' THEN books.title ELSE excluded.title END,
                            subtitle = COALESCE(NULLIF(excluded.subtitle, ''), books.subtitle),
                            authors_json = CASE WHEN excluded.authors_json = '[]'
                                THEN books.authors_json ELSE excluded.authors_json END,
                            narrators_json = CASE WHEN excluded.narrators_json = '[]'
                                THEN books.narrators_json ELSE excluded.narrators_json END,
                            cover_image = COALESCE(NULLIF(excluded.cover_image, ''), books.cover_image),
                            release_date = COALESCE(excluded.release_date, books.release_date),
                            runtime_length_min = COALESCE(NULLIF(excluded.runtime_length_min, 0),
                                books.runtime_length_min),
                            isbn_10 = COALESCE(books.isbn_10, excluded.isbn_10),
                            isbn_13 = COALESCE(books.isbn_13, excluded.isbn_13),
                            external_id = COALESCE(books.external_id, excluded.external_id),
                            updated_at = excluded.updated_at",
                    )?;
                    for book in &encoded {
                        written += stmt.execute(params![
                            book.asin,
                            book.title,
                            book.subtitle,
                            book.authors_json,
                            book.narrators_json,
                            book.cover_image,
                            book.release_date,
                            book.runtime_length_min,
                            book.isbn_10,
                            book.isbn_13,
                            book.external_id,
                            book.source,
                            book.downloaded,
                            updated_at,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(written)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete books last refreshed before `older_than` that nobody has
    /// requested and that are not downloaded. Returns the deleted ASINs.
    pub async fn delete_stale_books(&self, older_than: DateTime<Utc>) -> Result<Vec<String>, Error> {
        let cutoff = encode_ts(older_than);
        let deleted = self
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                const STALE: &str = "updated_at < ?1
                    AND downloaded = 0
                    AND asin NOT IN (SELECT DISTINCT asin FROM book_requests)";

                let tx = conn.transaction()?;
                let asins = {
                    let mut stmt = tx.prepare(&format!("SELECT asin FROM books WHERE {STALE}"))?;
                    let rows = stmt.query_map(params![cutoff], |row| row.get::<_, String>(0))?;
                    rows.collect::<Result<Vec<_>, _>>()?
                };
                tx.execute(&format!("DELETE FROM books WHERE {STALE}"), params![cutoff])?;
                tx.commit()?;
                Ok(asins)
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(count = deleted.len(), "cleared old book caches");
        Ok(deleted)
    }

    /// Case-insensitive substring match over title, subtitle, and authors.
    pub async fn search_books(&self, query: &str, limit: usize) -> Result<Vec<BookRecord>, Error> {
        let pattern = like_pattern(query.trim());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<BookRow>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM books
                     WHERE title LIKE ?1 ESCAPE '\\'
                        OR subtitle LIKE ?1 ESCAPE '\\'
                        OR authors_json LIKE ?1 ESCAPE '\\'
                     ORDER BY updated_at DESC
                     LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![pattern, limit], BookRow::from_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(BookRecord::try_from).collect()
    }

    /// Remove a book outright. Requests for it cascade.
    pub async fn delete_book(&self, asin: &str) -> Result<bool, Error> {
        let asin = asin.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                Ok(conn.execute("DELETE FROM books WHERE asin = ?1", params![asin])? > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Mark a book as downloaded (or not). Downloaded books are never garbage-collected.
    pub async fn set_downloaded(&self, asin: &str, downloaded: bool) -> Result<bool, Error> {
        let asin = asin.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let changed =
                    conn.execute("UPDATE books SET downloaded = ?2 WHERE asin = ?1", params![asin, downloaded])?;
                Ok(changed > 0)
            })
            .await
            .map_err(Error::from)
    }

    #[cfg(test)]
    pub(crate) async fn set_updated_at(&self, asin: &str, ts: DateTime<Utc>) -> Result<(), Error> {
        let (asin, ts) = (asin.to_string(), encode_ts(ts));
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("UPDATE books SET updated_at = ?2 WHERE asin = ?1", params![asin, ts])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_books(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
