//! Typed errors for the scrape orchestration core.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that terminate a scrape session.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Bad start parameters; reported to the caller, no session is created.
    #[error("invalid request: {reason}")]
    Validation { reason: String },

    /// The target host's crawl rules deny the crawl path.
    #[error("crawl policy blocks scraping on {host}")]
    PolicyBlocked { host: String },

    /// The first page of a session could not be fetched.
    #[error("first page fetch failed: {0}")]
    FirstPageFetch(#[source] FetchError),

    /// The lead store is unavailable (repeated commit failures).
    #[error("storage unavailable: {0}")]
    Storage(#[source] StorageError),

    /// The session was stopped by the caller.
    #[error("session cancelled")]
    Cancelled,
}

/// Page-level fetch failures. Retried and, past the first page,
/// downgraded to a page skip by the session manager.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetch exceeded the configured timeout.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Connection-level failure (DNS, refused, reset).
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// The target responded but refused the request (403, 429, captcha page).
    #[error("blocked by target fetching {url} (status {status})")]
    BlockedByTarget { url: String, status: u16 },
}

/// Commit-level storage failures. A single failure drops the record;
/// repeated failures abort the session via `ScrapeError::Storage`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Query or insert failed.
    #[error("storage operation failed: {0}")]
    Operation(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wrap any underlying store error.
    pub fn from_source(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Operation(Box::new(e))
    }
}

/// Result type alias for session-level operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
