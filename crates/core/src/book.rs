//! Canonical book record shared by adapters, the record store, and the cache.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Which catalog produced (or merged) a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSource {
    #[default]
    Audible,
    GoogleBooks,
    OpenLibrary,
    /// Found through a Google Books ISBN, resolved against Audible.
    GoogleBooksHybrid,
    /// Fields merged from more than one catalog.
    Hybrid,
}

impl BookSource {
    pub fn as_str(self) -> &'static str {
        match self {
            BookSource::Audible => "audible",
            BookSource::GoogleBooks => "google_books",
            BookSource::OpenLibrary => "openlibrary",
            BookSource::GoogleBooksHybrid => "google_books_hybrid",
            BookSource::Hybrid => "hybrid",
        }
    }
}

impl FromStr for BookSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audible" => Ok(BookSource::Audible),
            "google_books" => Ok(BookSource::GoogleBooks),
            "openlibrary" => Ok(BookSource::OpenLibrary),
            "google_books_hybrid" => Ok(BookSource::GoogleBooksHybrid),
            "hybrid" => Ok(BookSource::Hybrid),
            other => Err(Error::InvalidInput(format!("unknown book source: {other}"))),
        }
    }
}

impl fmt::Display for BookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized book / audiobook.
///
/// Records without any identifier are ephemeral: they can be returned from a
/// query but are never persisted or cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub asin: Option<String>,
    pub isbn_10: Option<String>,
    pub isbn_13: Option<String>,
    /// Identifier in a non-Audible catalog (Google Books volume id, OpenLibrary work key).
    pub external_id: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub narrators: Vec<String>,
    pub cover_image: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub runtime_length_min: Option<u32>,
    pub source: BookSource,
    pub downloaded: bool,
    pub updated_at: DateTime<Utc>,
}

impl BookRecord {
    /// An empty record with only a title and source set.
    pub fn new(title: impl Into<String>, source: BookSource) -> Self {
        Self {
            asin: None,
            isbn_10: None,
            isbn_13: None,
            external_id: None,
            title: title.into(),
            subtitle: None,
            authors: Vec::new(),
            narrators: Vec::new(),
            cover_image: None,
            release_date: None,
            runtime_length_min: None,
            source,
            downloaded: false,
            updated_at: Utc::now(),
        }
    }

    /// A partial record carrying only an ASIN, as returned by keyword search.
    pub fn from_asin(asin: impl Into<String>) -> Self {
        Self { asin: Some(asin.into()), ..Self::new(String::new(), BookSource::Audible) }
    }

    /// Whether the record can be stored or cached (has an ASIN or an ISBN).
    pub fn has_identifier(&self) -> bool {
        self.asin.is_some() || self.isbn_13.is_some() || self.isbn_10.is_some()
    }

    /// Stable key used to deduplicate mixed result lists.
    ///
    /// ASIN when present, then ISBN-13, ISBN-10, external id, and finally the
    /// lowercased title and authors.
    pub fn dedup_key(&self) -> String {
        if let Some(asin) = &self.asin {
            return format!("asin:{asin}");
        }
        if let Some(isbn) = &self.isbn_13 {
            return format!("isbn13:{isbn}");
        }
        if let Some(isbn) = &self.isbn_10 {
            return format!("isbn10:{isbn}");
        }
        if let Some(id) = &self.external_id {
            return format!("{}:{id}", self.source);
        }
        format!("title:{}|{}", self.title.to_lowercase(), self.authors.join(",").to_lowercase())
    }

    /// Fill fields that are empty on `self` from `other`; populated fields are never overwritten.
    ///
    /// Author and narrator lists are taken wholesale only when ours is empty.
    /// The source becomes [`BookSource::Hybrid`] when the two sources differ.
    pub fn fill_missing_from(&mut self, other: &BookRecord) {
        fill(&mut self.asin, &other.asin);
        fill(&mut self.isbn_10, &other.isbn_10);
        fill(&mut self.isbn_13, &other.isbn_13);
        fill(&mut self.external_id, &other.external_id);
        fill(&mut self.subtitle, &other.subtitle);
        fill(&mut self.cover_image, &other.cover_image);

        if self.title.is_empty() && !other.title.is_empty() {
            self.title = other.title.clone();
        }
        if self.authors.is_empty() && !other.authors.is_empty() {
            self.authors = other.authors.clone();
        }
        if self.narrators.is_empty() && !other.narrators.is_empty() {
            self.narrators = other.narrators.clone();
        }
        if self.release_date.is_none() {
            self.release_date = other.release_date;
        }
        if self.runtime_length_min.is_none_or(|m| m == 0) && other.runtime_length_min.is_some_and(|m| m > 0) {
            self.runtime_length_min = other.runtime_length_min;
        }

        if self.source != other.source {
            self.source = BookSource::Hybrid;
        }
    }

    /// Runtime in hours, rounded to one decimal.
    pub fn runtime_length_hrs(&self) -> Option<f64> {
        self.runtime_length_min.map(|m| (f64::from(m) / 60.0 * 10.0).round() / 10.0)
    }
}

fn fill(slot: &mut Option<String>, other: &Option<String>) {
    if slot.as_deref().is_none_or(str::is_empty)
        && let Some(value) = other.as_deref().filter(|v| !v.is_empty())
    {
        *slot = Some(value.to_string());
    }
}

/// Parse the loose date formats catalogs return.
///
/// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, and RFC 3339 timestamps (date part only).
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);

    if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return Some(date);
    }
    raw.parse::<i32>().ok().and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
}
