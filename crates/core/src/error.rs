//! Unified error types for precios.
//!
//! Display strings carry a stable code prefix so tool callers can match on
//! them without parsing the message.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types shared by the page and worker contexts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The fetch rejected or timed out.
    #[error("NETWORK_FAILURE: {0}")]
    NetworkFailure(String),

    /// No stored entry for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// A partition write would exceed the storage quota.
    #[error("QUOTA_EXCEEDED: {0}")]
    QuotaExceeded(String),

    /// The response body did not parse as the expected JSON.
    #[error("UPSTREAM_MALFORMED: {0}")]
    UpstreamMalformed(String),

    /// Neither the bundled dataset nor the remote endpoint is reachable.
    #[error("CATALOG_UNAVAILABLE: {0}")]
    CatalogUnavailable(String),

    /// Lifecycle signal received in the wrong state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
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
        Error::UpstreamMalformed(err.to_string())
    }
}

impl Error {
    /// Whether the error is a transport failure the strategies recover from.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkFailure(_))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::NetworkFailure(msg) => (-32006, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::QuotaExceeded(msg) => (-32007, msg.clone()),
            Error::UpstreamMalformed(msg) => (-32008, msg.clone()),
            Error::CatalogUnavailable(msg) => (-32009, msg.clone()),
            Error::InvalidState(msg) => (-32010, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("GET /static/css/style.css".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("style.css"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::NetworkFailure("connection refused".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32006);
    }

    #[test]
    fn test_json_error_is_upstream_malformed() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err().into();
        assert!(matches!(err, Error::UpstreamMalformed(_)));
    }

    #[test]
    fn test_is_network() {
        assert!(Error::NetworkFailure("x".into()).is_network());
        assert!(!Error::QuotaExceeded("x".into()).is_network());
    }
}
