//! Gitter HTTP client implementation.
//!
//! This module provides the client and the room message stream:
//!
//! - **Authenticate requests** with a bearer token
//! - **Subscribe to a room** and receive its messages as they are posted
//! - **Reconnect automatically** with linear backoff and a retry limit
//! - **Close a stream** from any task
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── fetch        - GitterClient and authenticated requests
//! ├── config       - Client configuration
//! ├── connection   - Shared connection state of a stream session
//! ├── parser       - Newline-delimited JSON decoder
//! ├── subscription - Stream sessions, events and the listen loop
//! └── utils        - Utility functions
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GitterClient`] | Authenticated HTTP client |
//! | [`ClientConfig`] | Client configuration options |
//! | [`StreamSession`] | One subscription to a room's messages |
//! | [`StreamCloser`] | Closes a session from another task |
//! | [`Events`] | Receiver of a session's events |
//! | [`LineDecoder`] | Splits a response body into lines |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use gitter_http::client::{ClientConfig, GitterClient};
//!
//! // Default configuration
//! let client = GitterClient::new("token");
//!
//! // Custom configuration
//! let config = ClientConfig {
//!     stream_max_retries: 10,
//!     stream_wait_ms: 500,
//!     ..Default::default()
//! };
//! let client = GitterClient::with_config("token", config);
//! ```
//!
//! ## Decoding Lines
//!
//! ```
//! use gitter_http::client::decode_message;
//!
//! let message = decode_message(br#"{"id":"1","text":"hi"}"#).unwrap().unwrap();
//! assert_eq!(message.text, "hi");
//!
//! // Keep-alive lines decode to nothing
//! assert!(decode_message(b" ").unwrap().is_none());
//! ```
//!
//! ## Backoff
//!
//! ```
//! use gitter_http::client::linear_backoff;
//! use std::time::Duration;
//!
//! let delay = linear_backoff(Duration::from_millis(100), 3);
//! assert_eq!(delay, Duration::from_millis(300));
//! ```

mod config;
mod connection;
mod fetch;
mod parser;
mod subscription;
mod utils;

pub use config::{
    ClientConfig, DEFAULT_STREAM_BASE_URL, DEFAULT_STREAM_MAX_RETRIES, DEFAULT_STREAM_WAIT_MS,
};
pub use connection::ConnectionState;
pub use fetch::GitterClient;
pub use parser::{decode_message, LineDecoder};
pub use subscription::{
    BodyStream, CloseReason, Event, Events, StreamCloser, StreamSession, StreamTransport,
};
pub use utils::*;
