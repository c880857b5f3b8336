//! Fetch operation
//!
//! Issues one request through a [`Transport`], wiring the transport's byte
//! deliveries into a [`ByteAccumulator`], and returns the finalized body.
//!
//! Two contracts are offered:
//!
//! - [`Fetcher::fetch`] always returns a [`Body`]. Transport init failure gives
//!   an empty body; any later failure gives whatever arrived before it.
//! - [`Fetcher::try_fetch`] returns a tagged outcome with status and headers on
//!   success and the specific [`Error`] otherwise.

use crate::accumulator::Body;
use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::transport::{HttpTransport, Request, ResponseHead, Session, Transport};

#[cfg(feature = "logging")]
use crate::logging_impl::{LogConfig, format_body_for_log, sanitize_for_log};

/// HTTP response with a fully buffered body.
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL (after redirects, if any)
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers (key-value pairs)
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Body,
}

impl Response {
    pub(crate) fn new(head: ResponseHead, body: Body) -> Self {
        Self {
            url: head.url,
            status: head.status,
            headers: head.headers,
            body,
        }
    }

    /// Get the body as a UTF-8 string (lossy)
    pub fn body_string(&self) -> String {
        self.body.to_string_lossy().into_owned()
    }

    /// Check if the response was successful (2xx status)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Runs single request/response exchanges over a transport.
pub struct Fetcher<T: Transport = HttpTransport> {
    transport: T,
    config: FetchConfig,
    #[cfg(feature = "logging")]
    log: LogConfig,
}

impl Default for Fetcher<HttpTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher<HttpTransport> {
    /// Create a fetcher over reqwest with default settings.
    pub fn new() -> Self {
        Self::with_config(FetchConfig::default())
    }

    /// Create a fetcher over reqwest with the given configuration.
    pub fn with_config(config: FetchConfig) -> Self {
        Self::with_transport(HttpTransport::new(config.clone()), config)
    }
}

impl<T: Transport> Fetcher<T> {
    /// Create a fetcher over any transport.
    ///
    /// `config` supplies the accumulator settings; transport settings in it
    /// are only used by transports built from it.
    pub fn with_transport(transport: T, config: FetchConfig) -> Self {
        Self {
            transport,
            config,
            #[cfg(feature = "logging")]
            log: LogConfig::default(),
        }
    }

    /// Replace the log redaction settings.
    #[cfg(feature = "logging")]
    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Fetch and return the body, swallowing every failure.
    ///
    /// Callers cannot tell an empty success from a failed exchange; use
    /// [`Fetcher::try_fetch`] when that matters.
    pub fn fetch(&self, request: &Request) -> Body {
        let (body, outcome) = self.exchange(request);
        if let Err(_e) = outcome {
            #[cfg(feature = "logging")]
            tracing::warn!(
                url = %self.log.redact_url(&request.url),
                error = %_e,
                bytes = body.len(),
                "fetch failed, returning partial body"
            );
        }
        body
    }

    /// Fetch and return the full response, or the reason it failed.
    pub fn try_fetch(&self, request: &Request) -> Result<Response> {
        let (body, outcome) = self.exchange(request);
        outcome.map(|head| Response::new(head, body))
    }

    /// Drive one exchange: open, perform, release.
    ///
    /// The body is always returned, even on failure, so both contracts share
    /// one code path.
    fn exchange(&self, request: &Request) -> (Body, Result<ResponseHead>) {
        #[cfg(feature = "logging")]
        tracing::debug!(
            method = %sanitize_for_log(&request.method),
            url = %self.log.redact_url(&request.url),
            payload_bytes = request.payload().map_or(0, <[u8]>::len),
            "fetch start"
        );

        let mut session = match self.transport.open() {
            Ok(session) => session,
            Err(e) => return (Body::empty(), Err(e)),
        };

        let mut acc = self.config.accumulator();
        let mut ingest_error: Option<Error> = None;
        let outcome = {
            let mut sink = |chunk: &[u8]| match acc.append(chunk) {
                Ok(accepted) => accepted,
                Err(e) => {
                    ingest_error = Some(e);
                    0
                }
            };
            session.perform(request, &mut sink)
        };
        drop(session);

        // Report why the sink refused a chunk rather than the generic abort
        let outcome = match (outcome, ingest_error) {
            (Err(Error::Aborted { .. }), Some(cause)) if cause.is_ingest_failure() => {
                Err(cause)
            }
            (outcome, _) => outcome,
        };

        #[cfg(feature = "logging")]
        {
            if let Ok(head) = &outcome {
                tracing::debug!(
                    status = head.status,
                    body = %format_body_for_log(acc.as_bytes()),
                    "fetch complete"
                );
            }
        }

        (acc.finalize(), outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted transport: fails to open, or delivers fixed chunks.
    struct ScriptedTransport {
        init_fails: bool,
        chunks: Vec<Vec<u8>>,
        fail_after: Option<usize>,
        seen: Rc<RefCell<Vec<Request>>>,
        released: Rc<RefCell<usize>>,
    }

    struct ScriptedSession {
        chunks: Vec<Vec<u8>>,
        fail_after: Option<usize>,
        seen: Rc<RefCell<Vec<Request>>>,
        released: Rc<RefCell<usize>>,
    }

    impl ScriptedTransport {
        fn delivering(chunks: &[&str]) -> Self {
            Self {
                init_fails: false,
                chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
                fail_after: None,
                seen: Rc::default(),
                released: Rc::default(),
            }
        }

        fn broken() -> Self {
            Self {
                init_fails: true,
                ..Self::delivering(&[])
            }
        }
    }

    impl Transport for ScriptedTransport {
        type Session = ScriptedSession;

        fn open(&self) -> Result<ScriptedSession> {
            if self.init_fails {
                return Err(Error::TransportInit("out of handles".into()));
            }
            Ok(ScriptedSession {
                chunks: self.chunks.clone(),
                fail_after: self.fail_after,
                seen: Rc::clone(&self.seen),
                released: Rc::clone(&self.released),
            })
        }
    }

    impl Session for ScriptedSession {
        fn perform(
            &mut self,
            request: &Request,
            sink: &mut crate::transport::Sink<'_>,
        ) -> Result<ResponseHead> {
            self.seen.borrow_mut().push(request.clone());
            for (i, chunk) in self.chunks.iter().enumerate() {
                if self.fail_after == Some(i) {
                    return Err(Error::Network("connection reset".into()));
                }
                let accepted = sink(chunk);
                if accepted != chunk.len() {
                    return Err(Error::Aborted {
                        accepted,
                        offered: chunk.len(),
                    });
                }
            }
            Ok(ResponseHead {
                url: request.url.clone(),
                status: 200,
                headers: vec![("Content-Type".into(), "text/plain".into())],
            })
        }
    }

    impl Drop for ScriptedSession {
        fn drop(&mut self) {
            *self.released.borrow_mut() += 1;
        }
    }

    fn fetcher(transport: ScriptedTransport) -> Fetcher<ScriptedTransport> {
        Fetcher::with_transport(transport, FetchConfig::default())
    }

    #[test]
    fn test_init_failure_returns_empty_body() {
        let body = fetcher(ScriptedTransport::broken()).fetch(&Request::get("http://x/"));
        assert!(body.is_empty());
        assert_eq!(body.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn test_init_failure_is_reported_by_try_fetch() {
        let err = fetcher(ScriptedTransport::broken())
            .try_fetch(&Request::get("http://x/"))
            .unwrap_err();
        assert!(matches!(err, Error::TransportInit(_)));
    }

    #[test]
    fn test_chunks_are_concatenated_in_order() {
        let f = fetcher(ScriptedTransport::delivering(&["hello", "", " world"]));
        let response = f.try_fetch(&Request::get("http://x/greeting")).unwrap();

        assert_eq!(response.body.as_bytes(), b"hello world");
        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.url, "http://x/greeting");
    }

    #[test]
    fn test_payload_reaches_transport_verbatim() {
        let transport = ScriptedTransport::delivering(&["ok"]);
        let seen = Rc::clone(&transport.seen);
        let f = fetcher(transport);

        f.fetch(&Request::post("http://x/form", "key=value"));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].payload(), Some(&b"key=value"[..]));
    }

    #[test]
    fn test_session_released_on_every_path() {
        let transport = ScriptedTransport {
            fail_after: Some(1),
            ..ScriptedTransport::delivering(&["a", "b"])
        };
        let released = Rc::clone(&transport.released);
        let f = fetcher(transport);

        f.fetch(&Request::get("http://x/"));
        f.try_fetch(&Request::get("http://x/")).unwrap_err();
        assert_eq!(*released.borrow(), 2);
    }

    #[test]
    fn test_transport_failure_keeps_partial_body() {
        let transport = ScriptedTransport {
            fail_after: Some(1),
            ..ScriptedTransport::delivering(&["partial", "rest"])
        };
        let f = fetcher(transport);

        assert_eq!(f.fetch(&Request::get("http://x/")).as_bytes(), b"partial");
        assert!(matches!(
            f.try_fetch(&Request::get("http://x/")),
            Err(Error::Network(_))
        ));
    }

    #[test]
    fn test_limit_aborts_with_ingest_cause() {
        let f = Fetcher::with_transport(
            ScriptedTransport::delivering(&["1234", "5678"]),
            FetchConfig::new().max_response_bytes(6),
        );

        assert_eq!(f.fetch(&Request::get("http://x/")).as_bytes(), b"1234");
        assert!(matches!(
            f.try_fetch(&Request::get("http://x/")),
            Err(Error::ResponseTooLarge { limit: 6 })
        ));
    }
}
