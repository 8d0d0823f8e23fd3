//! Error types for the search-and-match pipeline
//!
//! None of these cross the `SubtitleSource` boundary: adapters log them and
//! degrade to empty results instead.

use std::time::Duration;
use thiserror::Error;

/// Failure talking to an upstream (network, timeout, cancellation)
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cancelled")]
    Cancelled,

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Failure inside a single adapter operation
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL {0}")]
    InvalidUrl(String),

    #[error("No download link found on {0}")]
    NoDownloadLink(String),
}

impl SourceError {
    /// Cancellation ends a retry loop immediately
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SourceError::Transport(TransportError::Cancelled))
    }
}

/// Token could not be decoded by the strict codec
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),
}
