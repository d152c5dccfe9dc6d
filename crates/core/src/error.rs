//! Unified error types for quire.
//!
//! Each variant carries a stable code prefix in its display text so that
//! log lines and MCP error messages can be matched on.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the reader runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No cached response for the given URL.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Network or HTTP transport error.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// A designated navigation link is absent from the page.
    #[error("MISSING_LINK: {0}")]
    MissingLink(String),

    /// A CSS selector could not be parsed.
    #[error("INVALID_SELECTOR: {0}")]
    InvalidSelector(String),

    /// A route pattern is not a valid regular expression.
    #[error("INVALID_PATTERN: {0}")]
    InvalidPattern(String),

    /// Worker script could not be registered.
    #[error("REGISTRATION_FAILED: {0}")]
    RegistrationFailed(String),

    /// No page is currently open.
    #[error("NO_SESSION")]
    NoSession,
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

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::MissingLink(msg) => (-32020, msg.clone()),
            Error::InvalidSelector(msg) => (-32021, msg.clone()),
            Error::InvalidPattern(msg) => (-32022, msg.clone()),
            Error::RegistrationFailed(msg) => (-32023, msg.clone()),
            Error::NoSession => (-32024, "No page is open; call reader_open first".to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
