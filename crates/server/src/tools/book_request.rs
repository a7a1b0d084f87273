//! book_request and book_downloaded tool implementations.
//!
//! Requested and downloaded books are exempt from stale-record cleanup.

use abr_core::isbn::is_asin;
use abr_core::{Error, InFlightGuard};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{BookView, json_result, parse_region};
use crate::state::AppState;

/// Input parameters for book_request tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BookRequestParams {
    /// Audible ASIN of the requested book.
    pub asin: String,

    /// User making (or withdrawing) the request.
    pub username: String,

    /// Withdraw an existing request instead of adding one.
    #[serde(default)]
    pub withdraw: bool,

    /// Marketplace used to fetch the book if it is not stored yet.
    #[serde(default)]
    pub region: Option<String>,
}

/// Output structure for book_request tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookRequestOutput {
    pub book: Option<BookView>,
    /// False when the request already existed (or was already absent).
    pub changed: bool,
    pub requests: u64,
}

/// Input parameters for book_downloaded tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BookDownloadedParams {
    pub asin: String,

    /// New downloaded flag (default true).
    #[serde(default = "default_true")]
    pub downloaded: bool,
}

fn default_true() -> bool {
    true
}

/// Output structure for book_downloaded tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookDownloadedOutput {
    pub updated: bool,
}

fn checked_asin(asin: &str) -> Result<&str, Error> {
    let asin = asin.trim();
    if !is_asin(asin) {
        return Err(Error::InvalidIdentifier(asin.to_string()));
    }
    Ok(asin)
}

fn claim(state: &AppState, asin: &str) -> Result<InFlightGuard, Error> {
    state
        .in_flight
        .try_acquire(asin)
        .ok_or_else(|| Error::InvalidInput(format!("a request for {asin} is already in progress")))
}

/// Implementation of the book_request tool.
pub async fn request_impl(state: &AppState, params: BookRequestParams) -> Result<CallToolResult, McpError> {
    let asin = checked_asin(&params.asin)?;
    let username = params.username.trim();
    if username.is_empty() {
        return Err(Error::InvalidInput("username cannot be empty".into()).into());
    }
    let region = parse_region(&state.config, params.region.as_deref())?;

    let _guard = claim(state, asin)?;

    let changed = if params.withdraw {
        state.db.remove_request(asin, username).await?
    } else {
        if state.db.get_book(asin).await?.is_none() {
            let Some(book) = state.search.primary().catalog().fetch_by_identifier(asin, region).await else {
                return Err(Error::InvalidInput(format!("{asin} not found in the {region} catalog")).into());
            };
            state.db.upsert_books(std::slice::from_ref(&book)).await?;
        }
        state.db.add_request(asin, username).await?
    };

    let book = state.db.get_book(asin).await?;
    let requests = state.db.request_count(asin).await?;
    tracing::info!(asin, username, withdraw = params.withdraw, changed, requests, "book request updated");

    json_result(&BookRequestOutput { book: book.as_ref().map(BookView::from), changed, requests })
}

/// Implementation of the book_downloaded tool.
pub async fn downloaded_impl(state: &AppState, params: BookDownloadedParams) -> Result<CallToolResult, McpError> {
    let asin = checked_asin(&params.asin)?;
    let updated = state.db.set_downloaded(asin, params.downloaded).await?;
    json_result(&BookDownloadedOutput { updated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{audiobook, output, state_with};

    fn request(asin: &str, username: &str) -> BookRequestParams {
        BookRequestParams { asin: asin.into(), username: username.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_request_fetches_unknown_book() {
        let state = state_with(vec![audiobook("B002V1OF70", "Dune")], Vec::new()).await;

        let out: BookRequestOutput = output(&request_impl(&state, request("B002V1OF70", "alice")).await.unwrap());
        assert!(out.changed);
        assert_eq!(out.requests, 1);
        assert_eq!(out.book.unwrap().title, "Dune");

        let again: BookRequestOutput = output(&request_impl(&state, request("B002V1OF70", "alice")).await.unwrap());
        assert!(!again.changed);
        assert_eq!(again.requests, 1);
        assert!(state.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_withdraw() {
        let state = state_with(vec![audiobook("B002V1OF70", "Dune")], Vec::new()).await;
        request_impl(&state, request("B002V1OF70", "alice")).await.unwrap();

        let params = BookRequestParams { withdraw: true, ..request("B002V1OF70", "alice") };
        let out: BookRequestOutput = output(&request_impl(&state, params).await.unwrap());
        assert!(out.changed);
        assert_eq!(out.requests, 0);
    }

    #[tokio::test]
    async fn test_request_in_flight_rejected() {
        let state = state_with(vec![audiobook("B002V1OF70", "Dune")], Vec::new()).await;
        let _held = state.in_flight.try_acquire("B002V1OF70").unwrap();

        let err = request_impl(&state, request("B002V1OF70", "alice")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_request_rejects_bad_input() {
        let state = state_with(Vec::new(), Vec::new()).await;
        assert!(request_impl(&state, request("not an asin", "alice")).await.is_err());
        assert!(request_impl(&state, request("B002V1OF70", " ")).await.is_err());
        assert!(request_impl(&state, request("B002V1OF70", "alice")).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_downloaded() {
        let state = state_with(vec![audiobook("B002V1OF70", "Dune")], Vec::new()).await;
        let params = BookDownloadedParams { asin: "B002V1OF70".into(), downloaded: true };

        let out: BookDownloadedOutput = output(&downloaded_impl(&state, params.clone()).await.unwrap());
        assert!(!out.updated);

        request_impl(&state, request("B002V1OF70", "alice")).await.unwrap();
        let out: BookDownloadedOutput = output(&downloaded_impl(&state, params).await.unwrap());
        assert!(out.updated);
        assert!(state.db.get_book("B002V1OF70").await.unwrap().unwrap().downloaded);
    }
}
