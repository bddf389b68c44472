//! Error types for the Gitter client.
//!
//! Stream consumers never see these directly: the listen loop absorbs
//! transport failures into reconnects and reports the end of a session through
//! [`Event::ConnectionClosed`](crate::client::Event::ConnectionClosed). They
//! surface from the request-level API ([`GitterClient::get_response`],
//! [`GitterClient::stream`]) and from [`StreamTransport`] implementations.
//!
//! [`GitterClient::get_response`]: crate::client::GitterClient::get_response
//! [`GitterClient::stream`]: crate::client::GitterClient::stream
//! [`StreamTransport`]: crate::client::StreamTransport

use thiserror::Error;

/// Errors produced by the Gitter client.
#[derive(Debug, Error)]
pub enum GitterError {
    /// Transport level failure (connect, TLS, body read).
    #[error("http error: {0}")]
    Http(String),

    /// The server answered with a non-success status code.
    #[error("unexpected status code: {0}")]
    Status(u16),

    /// A record could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configured base URL could not be parsed.
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    /// A base URL parsed but cannot be used to build request paths.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The response body ended.
    #[error("stream ended")]
    StreamEnded,
}

impl GitterError {
    /// Returns the HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitterError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GitterError {
    fn from(err: reqwest::Error) -> Self {
        GitterError::Http(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, GitterError>;
