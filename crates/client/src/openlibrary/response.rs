//! OpenLibrary `search.json` response types and normalization.

use abr_core::isbn::{normalize_isbn, validate_isbn10, validate_isbn13};
use abr_core::{BookRecord, BookSource};
use chrono::NaiveDate;
use serde::Deserialize;

pub const COVERS_URL: &str = "https://covers.openlibrary.org/b/id";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub docs: Vec<Doc>,
}

#[derive(Debug, Deserialize)]
pub struct Doc {
    /// Work key, e.g. `/works/OL893415W`.
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author_name: Vec<String>,
    pub first_publish_year: Option<i32>,
    #[serde(default)]
    pub isbn: Vec<String>,
    pub cover_i: Option<i64>,
}

/// Medium-size cover for an OpenLibrary cover id.
pub fn cover_url(cover_id: i64) -> String {
    format!("{COVERS_URL}/{cover_id}-M.jpg")
}

impl Doc {
    /// First valid ISBN-10 and ISBN-13 among the edition ISBNs.
    fn isbns(&self) -> (Option<String>, Option<String>) {
        let normalized: Vec<String> = self.isbn.iter().map(|i| normalize_isbn(i)).collect();
        let isbn_10 = normalized.iter().find(|i| i.len() == 10 && validate_isbn10(i)).cloned();
        let isbn_13 = normalized.iter().find(|i| i.len() == 13 && validate_isbn13(i)).cloned();
        (isbn_10, isbn_13)
    }
}

impl From<Doc> for BookRecord {
    fn from(doc: Doc) -> Self {
        let (isbn_10, isbn_13) = doc.isbns();
        BookRecord {
            isbn_10,
            isbn_13,
            external_id: Some(doc.key),
            authors: doc.author_name,
            cover_image: doc.cover_i.filter(|id| *id > 0).map(cover_url),
            release_date: doc.first_publish_year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
            ..BookRecord::new(doc.title, BookSource::OpenLibrary)
        }
    }
}
