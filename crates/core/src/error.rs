//! Unified error types for larder.

use tokio_rusqlite::rusqlite;

/// Unified error types for the larder gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored value could not be encoded or decoded.
    #[error("CACHE_ERROR: encoding failed: {0}")]
    Encoding(String),

    /// Invalid URL or request target.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// HTTP error response or transport failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Install of a cache generation failed.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Lifecycle event arrived in a state that cannot accept it.
    #[error("INVALID_TRANSITION: {event} in state {state}")]
    InvalidTransition { state: String, event: String },

    /// No ready generation is available to serve from.
    #[error("GENERATION_MISSING: {0}")]
    GenerationMissing(String),
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
