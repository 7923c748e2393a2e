//! Error types for scraping and persistence.

use thiserror::Error;

/// Errors surfaced by scrapers and the registry.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Navigation retry budget exhausted. Fatal to that scraper's run only.
    #[error("navigation to {url} failed after {attempts} attempts: {last_error}")]
    NavigationFailure {
        url: String,
        attempts: u32,
        last_error: String,
    },
    /// Browser session could not be acquired or was lost mid-run.
    #[error("browser session error: {0}")]
    Session(String),
    /// No scraper registered for the requested game key. Fatal only to
    /// the call that used the key.
    #[error("no scraper registered for game key '{0}'")]
    NotSupported(String),
}

/// Errors raised by a game store.
///
/// These never cross a scraper's `run()` boundary; every store failure
/// routes into fallback synthesis instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
