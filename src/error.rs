//! Error types for outbound fetches
//!
//! A [`FetchError`] carries the failing URL for internal diagnostics only.
//! The HTTP boundary collapses every dispatcher failure to a plain 500;
//! callers learn that the batch failed, not which URL or why.

use thiserror::Error;

/// Failure of a single outbound GET
///
/// Any one of these fails the whole batch.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The upstream answered outside the 2xx range
    #[error("{url}: unexpected status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Connection, timeout, or body-read failure
    #[error("{url}: request failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// The URL whose fetch failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. } => url,
            FetchError::Request { url, .. } => url,
        }
    }
}
