//! Book metadata providers keyed by ASIN.
//!
//! Audimeta carries richer metadata and is asked first; Audnexus is the
//! fallback. Both describe the same Audible product with different field names.

use abr_core::book::parse_release_date;
use abr_core::{BookRecord, BookSource};
use serde::Deserialize;

pub const AUDIMETA_BASE_URL: &str = "https://audimeta.de";
pub const AUDNEXUS_BASE_URL: &str = "https://api.audnex.us";

/// Both providers ask callers to identify themselves with this header.
pub const CLIENT_AGENT: (&str, &str) = ("Client-Agent", "audiobookrequest");

#[derive(Debug, Deserialize)]
pub struct Person {
    pub name: String,
}

/// `GET https://audimeta.de/book/{asin}?region=`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudimetaBook {
    pub asin: String,
    pub title: String,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<Person>,
    #[serde(default)]
    pub narrators: Vec<Person>,
    pub image_url: Option<String>,
    pub release_date: Option<String>,
    pub length_minutes: Option<u32>,
    pub isbn: Option<String>,
}

/// `GET https://api.audnex.us/books/{asin}?region=`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudnexusBook {
    pub asin: String,
    pub title: String,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<Person>,
    #[serde(default)]
    pub narrators: Vec<Person>,
    pub image: Option<String>,
    pub release_date: Option<String>,
    pub runtime_length_min: Option<u32>,
    pub isbn: Option<String>,
}

fn names(people: Vec<Person>) -> Vec<String> {
    people.into_iter().map(|p| p.name).collect()
}

fn with_isbn(mut book: BookRecord, isbn: Option<String>) -> BookRecord {
    if let Some(isbn) = isbn.map(|i| abr_core::isbn::normalize_isbn(&i)) {
        if abr_core::isbn::validate_isbn13(&isbn) {
            book.isbn_13 = Some(isbn);
        } else if abr_core::isbn::validate_isbn10(&isbn) {
            book.isbn_10 = Some(isbn);
        }
    }
    book
}

impl From<AudimetaBook> for BookRecord {
    fn from(raw: AudimetaBook) -> Self {
        let book = BookRecord {
            asin: Some(raw.asin),
            subtitle: raw.subtitle.filter(|s| !s.is_empty()),
            authors: names(raw.authors),
            narrators: names(raw.narrators),
            cover_image: raw.image_url,
            release_date: raw.release_date.as_deref().and_then(parse_release_date),
            runtime_length_min: raw.length_minutes,
            ..BookRecord::new(raw.title, BookSource::Audible)
        };
        with_isbn(book, raw.isbn)
    }
}

impl From<AudnexusBook> for BookRecord {
    fn from(raw: AudnexusBook) -> Self {
        let book = BookRecord {
            asin: Some(raw.asin),
            subtitle: raw.subtitle.filter(|s| !s.is_empty()),
            authors: names(raw.authors),
            narrators: names(raw.narrators),
            cover_image: raw.image,
            release_date: raw.release_date.as_deref().and_then(parse_release_date),
            runtime_length_min: raw.runtime_length_min,
            ..BookRecord::new(raw.title, BookSource::Audible)
        };
        with_isbn(book, raw.isbn)
    }
}

pub fn audimeta_url(base: &str, asin: &str) -> String {
    format!("{base}/book/{asin}")
}

pub fn audnexus_url(base: &str, asin: &str) -> String {
    format!("{base}/books/{asin}")
}
