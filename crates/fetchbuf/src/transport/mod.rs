//! Transport layer for Fetchbuf
//!
//! The transport owns every protocol concern (DNS, TLS, redirects, chunked
//! transfer). Fetchbuf only configures a request and receives body bytes.
//!
//! # Lifecycle
//!
//! - [`Transport::open`] creates a session handle, or fails with `TransportInit`
//! - [`Session::perform`] configures the request and blocks until the exchange ends
//! - Dropping the session releases the handle

mod http;

pub use self::http::{HttpSession, HttpTransport, READ_CHUNK_SIZE};

use crate::error::Result;

/// Byte-delivery callback.
///
/// Called zero or more times with successive body chunks. Returns how many
/// bytes were accepted; anything short of the chunk length aborts the exchange.
pub type Sink<'a> = dyn FnMut(&[u8]) -> usize + 'a;

/// A single request: method, URL and optional payload.
///
/// Neither method nor URL is validated here; the transport reports bad input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: String,
    body: Option<Vec<u8>>,
}

impl Request {
    /// Create a request without a payload.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: None,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Create a POST request with a payload.
    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new("POST", url).body(body)
    }

    /// Attach a payload. An empty payload means "no body".
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        self.body = if body.is_empty() { None } else { Some(body) };
        self
    }

    /// Payload to send as-is, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// Status line and headers of the final response in the redirect chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// Final URL (after redirects, if any)
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers (key-value pairs)
    pub headers: Vec<(String, String)>,
}

/// Creates session handles.
pub trait Transport {
    type Session: Session;

    /// Acquire a handle for one exchange.
    fn open(&self) -> Result<Self::Session>;
}

/// One acquired transport handle.
pub trait Session {
    /// Run the exchange to completion, pushing body chunks into `sink`.
    fn perform(&mut self, request: &Request, sink: &mut Sink<'_>) -> Result<ResponseHead>;
}
