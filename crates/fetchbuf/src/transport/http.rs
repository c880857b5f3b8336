//! reqwest-backed transport.
//!
//! The blocking path drives `reqwest::blocking::Client` and pushes body chunks
//! into the session sink. The async path consumes `bytes_stream()` with an
//! explicit loop into a [`ByteAccumulator`](crate::ByteAccumulator).
//!
//! # Notes
//!
//! - The blocking client runs its own runtime internally. Do not open or drop
//!   an [`HttpSession`] from inside an async runtime; use
//!   [`HttpTransport::fetch_async`] there instead.
//! - Automatic decompression is not compiled in. Bodies arrive as sent.
//! - Redirects follow reqwest's policy: a 301, 302 or 303 turns the request
//!   into a body-less GET, so a custom method or payload only reaches the
//!   first hop. 307 and 308 keep both.
//! - A failure while reading the body surfaces as [`Error::Io`].
//! - Error messages are built with `without_url()` so credentials embedded
//!   in the URL never reach the caller.

use std::io::{ErrorKind, Read};
use std::sync::Once;

use futures_util::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};
use url::Url;

use super::{Request, ResponseHead, Session, Sink, Transport};
use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::fetch::Response;

/// Size of each read from the response body (8 KiB)
pub const READ_CHUNK_SIZE: usize = 8192;

/// Transport backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    config: FetchConfig,
}

/// One blocking reqwest client, released on drop.
#[derive(Debug)]
pub struct HttpSession {
    client: reqwest::blocking::Client,
    max_response_bytes: Option<usize>,
}

impl HttpTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    fn redirect_policy(&self) -> Policy {
        if self.config.follow_redirects {
            Policy::limited(self.config.max_redirects)
        } else {
            Policy::none()
        }
    }

    fn async_client(&self) -> Result<reqwest::Client> {
        install_crypto_provider();

        let mut builder = reqwest::Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .redirect(self.redirect_policy());
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| Error::TransportInit(format!("failed to create client: {}", e)))
    }

    /// Run the exchange on the async client.
    ///
    /// Must be awaited inside a tokio runtime.
    pub async fn fetch_async(&self, request: &Request) -> Result<Response> {
        let client = self.async_client()?;

        let mut builder = client.request(parse_method(&request.method)?, &request.url);
        if let Some(payload) = request.payload() {
            builder = builder.body(payload.to_vec());
        }

        let response = builder.send().await.map_err(send_error)?;
        let head = response_head(response.status(), response.url(), response.headers());
        check_content_length(response.content_length(), self.config.max_response_bytes)?;

        let mut acc = self.config.accumulator();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                Error::Network(format!("failed to read response chunk: {}", e.without_url()))
            })?;
            acc.append(&chunk)?;
        }

        Ok(Response::new(head, acc.finalize()))
    }
}

impl Transport for HttpTransport {
    type Session = HttpSession;

    fn open(&self) -> Result<HttpSession> {
        #[cfg(feature = "failpoints")]
        fail::fail_point!("transport::open", |_| Err(Error::TransportInit(
            "injected init failure".to_string()
        )));

        install_crypto_provider();

        // Blocking client defaults to a 30s timeout; pass ours through even when None
        let client = reqwest::blocking::Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .redirect(self.redirect_policy())
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .build()
            .map_err(|e| Error::TransportInit(format!("failed to create client: {}", e)))?;

        Ok(HttpSession {
            client,
            max_response_bytes: self.config.max_response_bytes,
        })
    }
}

impl Session for HttpSession {
    fn perform(&mut self, request: &Request, sink: &mut Sink<'_>) -> Result<ResponseHead> {
        let mut builder = self
            .client
            .request(parse_method(&request.method)?, &request.url);
        if let Some(payload) = request.payload() {
            builder = builder.body(payload.to_vec());
        }

        let mut response = builder.send().map_err(send_error)?;
        let head = response_head(response.status(), response.url(), response.headers());
        check_content_length(response.content_length(), self.max_response_bytes)?;

        pump(&mut response, sink)?;
        Ok(head)
    }
}

/// Read `reader` to the end in fixed-size chunks, pushing each into `sink`.
fn pump(reader: &mut impl Read, sink: &mut Sink<'_>) -> Result<()> {
    let mut buffer = [0u8; READ_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        #[cfg(feature = "logging")]
        tracing::trace!(bytes = n, "delivering chunk");

        let accepted = sink(&buffer[..n]);
        if accepted != n {
            return Err(Error::Aborted {
                accepted,
                offered: n,
            });
        }
    }
}

/// Install the `ring` rustls provider once per process.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        // Err means another provider is already installed, which is fine
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.as_bytes())
        .map_err(|_| Error::Network(format!("invalid method: {:?}", method)))
}

fn send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network("operation timed out".to_string())
    } else {
        Error::Network(format!("request failed: {}", e.without_url()))
    }
}

/// Fail fast when the declared length already exceeds the limit.
fn check_content_length(content_length: Option<u64>, limit: Option<usize>) -> Result<()> {
    if let (Some(length), Some(limit)) = (content_length, limit) {
        if length > limit as u64 {
            return Err(Error::ResponseTooLarge { limit });
        }
    }
    Ok(())
}

fn response_head(status: StatusCode, url: &Url, headers: &HeaderMap) -> ResponseHead {
    ResponseHead {
        url: url.to_string(),
        status: status.as_u16(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect(),
    }
}
