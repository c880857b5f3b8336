//! Fetchbuf - Blocking HTTP fetch into a single owned buffer
//!
//! Performs one request (method, URL, optional body) through reqwest and
//! collects the response body, chunk by chunk, into a [`ByteAccumulator`].
//! The result is a [`Body`] that always carries a trailing NUL byte, so it is
//! safe to hand to text-oriented consumers even when empty.
//!
//! # Example
//!
//! ```rust,no_run
//! let body = fetchbuf::fetch("GET", "https://example.com", "");
//! println!("{} bytes", body.len());
//!
//! // Tagged outcome with status and headers
//! match fetchbuf::try_fetch("POST", "https://example.com/form", "key=value") {
//!     Ok(response) => println!("{} {}", response.status, response.body_string()),
//!     Err(e) => eprintln!("fetch failed: {}", e),
//! }
//! ```
//!
//! # Custom transports
//!
//! Anything implementing [`Transport`] can drive a [`Fetcher`]; the
//! accumulator only sees byte chunks pushed through a [`Sink`].

mod accumulator;
mod config;
mod error;
mod fetch;
pub mod ffi;
#[cfg(feature = "logging")]
mod logging_impl;
mod transport;

pub use accumulator::{Body, ByteAccumulator, GrowthPolicy, TERMINATOR};
pub use config::{DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT, FetchConfig};
pub use error::{Error, Result};
pub use fetch::{Fetcher, Response};
#[cfg(feature = "logging")]
pub use logging_impl::{LogConfig, format_body_for_log, sanitize_for_log};
pub use transport::{
    HttpSession, HttpTransport, READ_CHUNK_SIZE, Request, ResponseHead, Session, Sink, Transport,
};

/// Fetch `url` and return the body, whatever happens.
///
/// An empty `body` means "no payload". Failures of any kind yield whatever
/// bytes arrived before the failure, possibly none.
///
/// Blocks the calling thread; do not call from inside an async runtime.
pub fn fetch(method: &str, url: &str, body: &str) -> Body {
    Fetcher::new().fetch(&Request::new(method, url).body(body))
}

/// Fetch `url` and return the response, or the reason it failed.
///
/// Blocks the calling thread; do not call from inside an async runtime.
pub fn try_fetch(method: &str, url: &str, body: &str) -> Result<Response> {
    Fetcher::new().try_fetch(&Request::new(method, url).body(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_unreachable_scheme_is_empty() {
        let body = fetch("GET", "ftp://localhost/file", "");
        assert!(body.is_empty());
        assert_eq!(body.as_bytes_with_nul(), &[TERMINATOR]);
    }

    #[test]
    fn test_try_fetch_reports_malformed_url() {
        let err = try_fetch("GET", "::not a url::", "").unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
