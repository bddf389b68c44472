#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Gitter HTTP
//!
//! A client for the [Gitter](https://gitter.im) HTTP API focused on the room
//! message stream.
//!
//! ## Overview
//!
//! Gitter pushes new room messages over a long-lived HTTP response, one JSON
//! object per line. This crate keeps such a response open for you:
//!
//! 1. **Connect** - authenticated GET on the room's stream endpoint
//! 2. **Decode** - split the body on newlines and parse each line as a [`Message`]
//! 3. **Reconnect** - on any failure, retry with linear backoff up to a limit
//! 4. **Deliver** - publish [`Event`]s in order on a single channel, ending
//!    with exactly one [`Event::ConnectionClosed`]
//!
//! ## Client Usage
//!
//! ```ignore
//! use gitter_http::{Event, GitterClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GitterClient::new("YOUR_ACCESS_TOKEN");
//!     let (session, mut events) = client.stream("ROOM_ID")?;
//!     let closer = session.closer();
//!
//!     tokio::spawn(session.listen());
//!
//!     while let Some(event) = events.next().await {
//!         match event {
//!             Event::MessageReceived(message) => {
//!                 println!("{}: {}", message.from_user.username, message.text);
//!                 if message.text == "/quit" {
//!                     closer.close();
//!                 }
//!             }
//!             Event::ConnectionClosed(reason) => println!("closed: {:?}", reason),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Gitter records (Message, User, ...)
//! - **[error]** - Error types and result handling
//! - **[client]** - HTTP client and stream sessions

pub mod client;
pub mod error;
pub mod types;

pub use client::{
    ClientConfig, CloseReason, Event, Events, GitterClient, StreamCloser, StreamSession,
    StreamTransport,
};
pub use error::{GitterError, Result};
pub use types::{Message, User};

#[cfg(test)]
mod tests;
