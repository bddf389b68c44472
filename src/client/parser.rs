//! Line decoder for the Gitter message stream.
//!
//! The streaming endpoint writes one JSON message per line and keeps the
//! response open indefinitely. Between messages the server sends a lone
//! whitespace line as a keep-alive.
//!
//! # Decoding Flow
//!
//! 1. Accumulate body chunks until a `\n` is buffered
//! 2. Split off that line (a line may span chunks, a chunk may hold many lines)
//! 3. Decode the line: whitespace only is a heartbeat, anything else must be a
//!    JSON [`Message`]
//!
//! Bytes after the last newline stay buffered for the next read. When the body
//! ends, a trailing partial line is discarded.

use crate::client::BodyStream;
use crate::error::{GitterError, Result};
use crate::types::Message;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;

/// Incremental newline splitter over a response body.
pub struct LineDecoder {
    /// Response body being read
    body: BodyStream,
    /// Bytes received but not yet returned as a line
    buffer: BytesMut,
    /// Prefix of `buffer` already known to contain no newline
    scanned: usize,
}

impl LineDecoder {
    /// Create a decoder reading from `body`.
    pub fn new(body: BodyStream) -> Self {
        LineDecoder {
            body,
            buffer: BytesMut::with_capacity(4096),
            scanned: 0,
        }
    }

    /// Read the next complete line, without its `\n` or `\r\n` terminator.
    ///
    /// Returns [`GitterError::StreamEnded`] once the body is exhausted, or the
    /// body's own error if reading fails.
    pub async fn next_line(&mut self) -> Result<Bytes> {
        loop {
            if let Some(line) = self.split_line() {
                return Ok(line);
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(err)) => return Err(err),
                None => {
                    if !self.buffer.is_empty() {
                        tracing::debug!(
                            bytes = self.buffer.len(),
                            "discarding partial line at end of stream"
                        );
                        self.buffer.clear();
                        self.scanned = 0;
                    }
                    return Err(GitterError::StreamEnded);
                }
            }
        }
    }

    /// Number of buffered bytes not yet returned.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn split_line(&mut self) -> Option<Bytes> {
        let offset = self.buffer[self.scanned..].iter().position(|b| *b == b'\n');
        let Some(offset) = offset else {
            self.scanned = self.buffer.len();
            return None;
        };

        let end = self.scanned + offset;
        let mut line = self.buffer.split_to(end + 1);
        self.scanned = 0;

        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }
        Some(line.freeze())
    }
}

impl std::fmt::Debug for LineDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineDecoder")
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

/// Decode one stream line.
///
/// Returns `Ok(None)` for a heartbeat (empty or whitespace-only line).
pub fn decode_message(line: &[u8]) -> Result<Option<Message>> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(line)?))
}
