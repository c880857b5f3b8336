//! Error types for Fetchbuf
//!
//! This module provides error types for the fetch path with the following design goals:
//! - Human-readable error messages for users
//! - No leakage of URL credentials in messages
//! - Clear categorization for programmatic handling

use thiserror::Error;

/// Result type alias using Fetchbuf's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Fetchbuf error types.
#[derive(Error, Debug)]
pub enum Error {
    /// The transport could not allocate or configure its handle.
    #[error("transport init failed: {0}")]
    TransportInit(String),

    /// Network or protocol failure reported by the transport.
    #[error("network error: {0}")]
    Network(String),

    /// The accumulator could not grow its storage.
    #[error("allocation failed: could not grow buffer to {requested} bytes")]
    Allocation { requested: usize },

    /// The response body exceeded the configured byte limit.
    #[error("response too large: exceeded {limit} bytes limit")]
    ResponseTooLarge { limit: usize },

    /// The byte sink accepted fewer bytes than offered, so the transfer was abandoned.
    #[error("transfer aborted: sink accepted {accepted} of {offered} bytes")]
    Aborted { accepted: usize, offered: usize },

    /// I/O error while reading the response body.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from ingesting bytes rather than from the transport.
    pub fn is_ingest_failure(&self) -> bool {
        matches!(
            self,
            Error::Allocation { .. } | Error::ResponseTooLarge { .. }
        )
    }
}
