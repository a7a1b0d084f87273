//! Unified error types for the search core.
//!
//! Upstream catalog failures never appear here: adapters swallow them. What
//! remains is caller misuse (bad input) and local storage failures.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type for abr.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty author name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Region code is not one of the supported Audible marketplaces.
    #[error("INVALID_REGION: {0}")]
    InvalidRegion(String),

    /// Identifier does not look like an ASIN or ISBN.
    #[error("INVALID_IDENTIFIER: {0}")]
    InvalidIdentifier(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored column could not be encoded or decoded.
    #[error("STORE_ERROR: serialization failed: {0}")]
    Serialization(String),
}

impl Error {
    /// True for errors caused by the caller rather than the environment.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::InvalidRegion(_) | Error::InvalidIdentifier(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidRegion(region) => (-32602, format!("invalid region: {region}")),
            Error::InvalidIdentifier(id) => (-32602, format!("invalid identifier: {id}")),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Serialization(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidRegion("xx".to_string());
        assert!(err.to_string().contains("INVALID_REGION"));
        assert!(err.to_string().contains("xx"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::InvalidRegion("xx".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32602);

        let err = Error::MigrationFailed("boom".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_is_invalid_input() {
        assert!(Error::InvalidInput("empty".into()).is_invalid_input());
        assert!(Error::InvalidIdentifier("??".into()).is_invalid_input());
        assert!(!Error::Serialization("bad json".into()).is_invalid_input());
    }
}
