//! Client configuration.

use std::time::Duration;

/// Default streaming API base URL.
pub const DEFAULT_STREAM_BASE_URL: &str = "https://stream.gitter.im/v1/";
/// Default wait unit between stream reconnect attempts, in milliseconds.
pub const DEFAULT_STREAM_WAIT_MS: u64 = 3000;
/// Default number of stream reconnect attempts before giving up.
pub const DEFAULT_STREAM_MAX_RETRIES: u32 = 5;

/// Configuration for [`GitterClient`](crate::client::GitterClient).
///
/// The base URL is plain configuration so tests and self-hosted deployments can
/// point the client elsewhere.
///
/// # Examples
///
/// ```
/// use gitter_http::client::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_stream_base_url("http://127.0.0.1:8080/")
///     .with_stream_max_retries(2);
/// assert_eq!(config.stream_max_retries, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Streaming API base URL
    pub stream_base_url: String,
    /// Backoff unit for stream reconnects, in milliseconds
    pub stream_wait_ms: u64,
    /// Maximum consecutive failed stream connects before the session closes
    pub stream_max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            stream_base_url: DEFAULT_STREAM_BASE_URL.to_string(),
            stream_wait_ms: DEFAULT_STREAM_WAIT_MS,
            stream_max_retries: DEFAULT_STREAM_MAX_RETRIES,
        }
    }
}

impl ClientConfig {
    /// Set the streaming API base URL.
    #[must_use]
    pub fn with_stream_base_url(mut self, url: impl Into<String>) -> Self {
        self.stream_base_url = url.into();
        self
    }

    /// Set the stream reconnect wait unit.
    ///
    /// Rounded up to whole milliseconds, so a non-zero wait never becomes zero.
    #[must_use]
    pub fn with_stream_wait(mut self, wait: Duration) -> Self {
        let millis = wait.as_nanos().div_ceil(1_000_000);
        self.stream_wait_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    /// Set the stream reconnect limit.
    #[must_use]
    pub fn with_stream_max_retries(mut self, retries: u32) -> Self {
        self.stream_max_retries = retries;
        self
    }

    /// Stream reconnect wait unit as a [`Duration`].
    pub fn stream_wait(&self) -> Duration {
        Duration::from_millis(self.stream_wait_ms)
    }
}
