//! Fetch configuration
//!
//! Transport settings (redirects, timeouts, user agent) and accumulator
//! settings (growth policy, byte limit) in one builder.

use std::time::Duration;

use crate::accumulator::{ByteAccumulator, GrowthPolicy};

/// Default number of redirects followed before giving up
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("fetchbuf/", env!("CARGO_PKG_VERSION"));

/// Configuration for a [`Fetcher`](crate::Fetcher).
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent header value
    /// Default: "fetchbuf/<version>"
    pub user_agent: String,

    /// Follow redirects transparently; the body of the final response is returned
    /// Default: true
    pub follow_redirects: bool,

    /// Maximum redirect hops when following
    /// Default: 10
    pub max_redirects: usize,

    /// Overall request timeout
    /// Default: None (the exchange runs until the transport gives up)
    pub timeout: Option<Duration>,

    /// Connection timeout
    /// Default: None
    pub connect_timeout: Option<Duration>,

    /// Maximum response body size in bytes
    /// Default: None (unbounded)
    pub max_response_bytes: Option<usize>,

    /// Accumulator growth policy
    /// Default: amortized
    pub growth: GrowthPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: None,
            connect_timeout: None,
            max_response_bytes: None,
            growth: GrowthPolicy::Amortized,
        }
    }
}

impl FetchConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable or disable redirect following
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Set maximum redirect hops
    pub fn max_redirects(mut self, hops: usize) -> Self {
        self.max_redirects = hops;
        self
    }

    /// Set overall request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Cap the response body size
    pub fn max_response_bytes(mut self, bytes: usize) -> Self {
        self.max_response_bytes = Some(bytes);
        self
    }

    /// Set accumulator growth policy
    pub fn growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Fresh accumulator honoring the growth policy and byte limit.
    pub fn accumulator(&self) -> ByteAccumulator {
        let acc = ByteAccumulator::with_growth(self.growth);
        match self.max_response_bytes {
            Some(limit) => acc.max_bytes(limit),
            None => acc,
        }
    }
}
