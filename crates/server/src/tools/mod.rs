//! MCP tool implementations.
//!
//! This module contains all tools exposed by the abr-search server, plus the
//! argument parsing and output shapes they share.

pub mod book_request;
pub mod book_search;
pub mod cache;
pub mod multi_search;
pub mod suggestions;

use abr_core::config::SEARCHABLE_SOURCES;
use abr_core::{AppConfig, BookRecord, BookSource, Error, Region};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Upper bound on `num_results` for every search tool.
pub const MAX_NUM_RESULTS: usize = 200;

/// Largest `page * num_results` offset a paged search will serve.
pub const MAX_RESULT_OFFSET: usize = 1000;

/// A book as returned by the search tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn_10: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn_13: Option<String>,
    /// Google Books volume id or OpenLibrary work key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub narrators: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// ISO date (YYYY-MM-DD).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_length_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_length_hrs: Option<f64>,
    /// Catalog that produced the record: audible, google_books, openlibrary, google_books_hybrid, or hybrid.
    pub source: String,
    pub downloaded: bool,
    /// Number of users who requested this book (keyword search only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<u64>,
}

impl From<&BookRecord> for BookView {
    fn from(book: &BookRecord) -> Self {
        Self {
            asin: book.asin.clone(),
            isbn_10: book.isbn_10.clone(),
            isbn_13: book.isbn_13.clone(),
            external_id: book.external_id.clone(),
            title: book.title.clone(),
            subtitle: book.subtitle.clone(),
            authors: book.authors.clone(),
            narrators: book.narrators.clone(),
            cover_image: book.cover_image.clone(),
            release_date: book.release_date.map(|d| d.format("%Y-%m-%d").to_string()),
            runtime_length_min: book.runtime_length_min,
            runtime_length_hrs: book.runtime_length_hrs(),
            source: book.source.to_string(),
            downloaded: book.downloaded,
            requests: None,
        }
    }
}

/// Output shared by the list-returning search tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookListOutput {
    pub books: Vec<BookView>,
    pub count: usize,
}

impl BookListOutput {
    pub fn new(books: &[BookRecord]) -> Self {
        let books: Vec<BookView> = books.iter().map(BookView::from).collect();
        Self { count: books.len(), books }
    }
}

/// Parse an optional region code, falling back to the configured default.
pub fn parse_region(config: &AppConfig, region: Option<&str>) -> Result<Region, Error> {
    match region {
        Some(code) => code.parse(),
        None => Ok(config.region()),
    }
}

/// Parse requested source names, falling back to every enabled source.
///
/// Names must be searchable sources that are enabled in the configuration.
pub fn parse_sources(config: &AppConfig, sources: Option<&[String]>) -> Result<Vec<BookSource>, Error> {
    let Some(names) = sources else {
        return Ok(config.enabled_sources.clone());
    };

    let mut parsed = Vec::with_capacity(names.len());
    for name in names {
        let source: BookSource = name.trim().parse()?;
        if !SEARCHABLE_SOURCES.contains(&source) {
            return Err(Error::InvalidInput(format!("{source} is not a searchable source")));
        }
        if !config.source_enabled(source) {
            return Err(Error::InvalidInput(format!("source {source} is disabled")));
        }
        if !parsed.contains(&source) {
            parsed.push(source);
        }
    }
    if parsed.is_empty() {
        return Err(Error::InvalidInput("sources cannot be empty".into()));
    }
    Ok(parsed)
}

pub fn check_num_results(num_results: usize) -> Result<usize, Error> {
    if num_results > MAX_NUM_RESULTS {
        return Err(Error::InvalidInput(format!("num_results must be at most {MAX_NUM_RESULTS}")));
    }
    Ok(num_results)
}

/// Offset of the first result on `page`, rejected past [`MAX_RESULT_OFFSET`].
pub fn check_offset(page: usize, num_results: usize) -> Result<usize, Error> {
    page.checked_mul(num_results)
        .filter(|offset| *offset <= MAX_RESULT_OFFSET)
        .ok_or_else(|| Error::InvalidInput(format!("page * num_results must be at most {MAX_RESULT_OFFSET}")))
}

/// Serialize a tool output as pretty JSON text content.
pub fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::Serialization(format!("failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
