//! Unified error types for the offline worker.
//!
//! Every variant carries a stable code prefix in its display form; the same
//! codes are used when an error crosses the MCP boundary.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., caching a POST).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch rejected by the transport. Always recoverable through the cache
    /// or fallback tiers.
    #[error("NETWORK_FAILURE: {0}")]
    NetworkFailure(String),

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// A partition write failed (quota or IO).
    #[error("STORAGE_FAILURE: {0}")]
    StorageFailure(String),

    /// An asset in the install-time manifest could not be fetched.
    #[error("STATIC_SEED_FAILURE: {url}: {reason}")]
    StaticSeedFailure { url: String, reason: String },

    /// One background sync step failed.
    #[error("SYNC_STEP_FAILURE: {step}: {reason}")]
    SyncStepFailure { step: String, reason: String },

    /// Lifecycle transition requested from the wrong state.
    #[error("INVALID_STATE: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

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

impl From<crate::url::UrlError> for Error {
    fn from(err: crate::url::UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::NetworkFailure(_) => -32000,
            Error::CacheMiss(_) => -32001,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::InvalidUrl(_) => -32003,
            Error::StorageFailure(_) => -32004,
            Error::StaticSeedFailure { .. } => -32005,
            Error::SyncStepFailure { .. } => -32006,
            Error::InvalidState { .. } => -32007,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
