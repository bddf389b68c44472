//! Room message stream sessions.
//!
//! A [`StreamSession`] is one subscription to a room's message stream. Calling
//! [`StreamSession::listen`] runs the session until it is closed: it connects,
//! decodes one message per line, reconnects on failure with linear backoff,
//! and publishes every decoded message to the [`Events`] receiver handed out
//! alongside the session. The last event of every session is a single
//! [`Event::ConnectionClosed`], after which the receiver yields `None`.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──listen──> Connecting ──ok──> Connected
//!                    ^   │               │
//!                    └───┼── read fails ─┘
//!                        │
//!       retries exhausted│ or close()
//!                        v
//!                     Closed (terminal)
//! ```
//!
//! # Examples
//!
//! ```ignore
//! use gitter_http::{Event, GitterClient};
//!
//! let client = GitterClient::new("token");
//! let (session, mut events) = client.stream("room-id")?;
//! let closer = session.closer();
//! tokio::spawn(session.listen());
//!
//! while let Some(event) = events.next().await {
//!     match event {
//!         Event::MessageReceived(message) => println!("{}: {}", message.from_user.username, message.text),
//!         Event::ConnectionClosed(reason) => println!("closed: {:?}", reason),
//!     }
//! }
//! ```

use crate::client::connection::ConnectionState;
use crate::client::parser::{decode_message, LineDecoder};
use crate::error::Result;
use crate::types::Message;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, trace, warn};

/// Response body of a stream connection.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Opens authenticated stream connections.
///
/// Implemented by [`GitterClient`](crate::client::GitterClient). Any error, a
/// non-success status included, counts as one failed connect attempt.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Issue the long-lived GET for `url` and return its body.
    async fn open(&self, url: &str) -> Result<BodyStream>;
}

/// Why a session reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Every reconnect attempt failed
    RetriesExhausted,
    /// [`StreamCloser::close`] was called, or the receiver was dropped
    Requested,
}

/// Event published by a stream session.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A message was decoded from the stream
    MessageReceived(Message),
    /// The session is closed; always the last event
    ConnectionClosed(CloseReason),
}

struct Shared {
    state: Mutex<ConnectionState<LineDecoder>>,
    shutdown: watch::Sender<bool>,
}

/// One subscription to a room's message stream.
pub struct StreamSession {
    url: String,
    transport: Arc<dyn StreamTransport>,
    shared: Arc<Shared>,
    events: mpsc::Sender<Event>,
}

impl StreamSession {
    /// Create a session for `url` and the receiver for its events.
    ///
    /// At most one event is buffered ahead of the consumer. Decoding then
    /// waits until that event is received, so a slow consumer holds back
    /// reading instead of losing messages.
    pub fn new(
        url: impl Into<String>,
        transport: Arc<dyn StreamTransport>,
        wait: Duration,
        max_retries: u32,
    ) -> (Self, Events) {
        let (tx, rx) = mpsc::channel(1);
        let (shutdown, _) = watch::channel(false);
        let session = StreamSession {
            url: url.into(),
            transport,
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::new(wait, max_retries)),
                shutdown,
            }),
            events: tx,
        };
        (session, Events::new(rx))
    }

    /// Override the backoff unit between reconnects.
    #[must_use]
    pub fn with_connection_wait(self, wait: Duration) -> Self {
        self.shared.state.lock().set_wait(wait);
        self
    }

    /// Override the number of failed connects tolerated before closing.
    #[must_use]
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        self.shared.state.lock().set_max_retries(max_retries);
        self
    }

    /// The stream URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// A handle that can close this session from another task.
    pub fn closer(&self) -> StreamCloser {
        StreamCloser {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Close the session. See [`StreamCloser::close`].
    pub fn close(&self) {
        self.closer().close();
    }

    /// Whether the session has no live connection.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().is_closed()
    }

    /// Run the session until it closes.
    ///
    /// Consumes the session, so each session is listened to at most once.
    /// Returns after the final [`Event::ConnectionClosed`] is delivered, or as
    /// soon as the [`Events`] receiver is dropped, even while the stream is
    /// idle or reconnecting.
    pub async fn listen(self) {
        let mut shutdown = self.shared.shutdown.subscribe();
        info!(url = %self.url, "listening to stream");

        self.connect(&mut shutdown).await;

        loop {
            let next = {
                let mut state = self.shared.state.lock();
                if state.is_closed() {
                    Err(state.close_reason().unwrap_or(CloseReason::Requested))
                } else {
                    Ok(state.take_reader())
                }
            };

            let reader = match next {
                Ok(reader) => reader,
                Err(reason) => {
                    let _ = self.events.send(Event::ConnectionClosed(reason)).await;
                    break;
                }
            };

            let Some(mut reader) = reader else {
                self.connect(&mut shutdown).await;
                continue;
            };

            let read = tokio::select! {
                line = reader.next_line() => line,
                _ = wait_closed(&mut shutdown) => continue,
                _ = self.events.closed() => {
                    self.receiver_dropped();
                    break;
                }
            };

            let line = match read {
                Ok(line) => line,
                Err(err) => {
                    if self.shared.state.lock().is_closed() {
                        continue;
                    }
                    debug!(url = %self.url, error = %err, "stream read failed, reconnecting");
                    drop(reader);
                    self.connect(&mut shutdown).await;
                    continue;
                }
            };

            if !self.shared.state.lock().restore_reader(reader) {
                continue;
            }

            match decode_message(&line) {
                Ok(Some(message)) => {
                    if self
                        .events
                        .send(Event::MessageReceived(message))
                        .await
                        .is_err()
                    {
                        self.receiver_dropped();
                        break;
                    }
                }
                Ok(None) => trace!(url = %self.url, "heartbeat"),
                Err(err) => warn!(url = %self.url, error = %err, "dropping malformed record"),
            }
        }

        self.shared.state.lock().take_reader();
        info!(url = %self.url, "listening was completed");
    }

    /// Connect, retrying with linear backoff.
    ///
    /// Returns `true` once a connection is live. Returns `false` when the
    /// session closed meanwhile or the retry budget ran out; in the latter case
    /// the session is marked closed here.
    async fn connect(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        loop {
            {
                let mut state = self.shared.state.lock();
                if state.is_terminal() {
                    return false;
                }
                if state.retries_exhausted() {
                    let max_retries = state.max_retries();
                    state.mark_closed(CloseReason::RetriesExhausted);
                    warn!(url = %self.url, max_retries, "stream retries exhausted, closing");
                    return false;
                }
            }

            let opened = tokio::select! {
                result = self.transport.open(&self.url) => result,
                _ = wait_closed(shutdown) => return false,
                _ = self.events.closed() => {
                    self.receiver_dropped();
                    return false;
                }
            };

            match opened {
                Ok(body) => {
                    let connected = self
                        .shared
                        .state
                        .lock()
                        .record_connect(LineDecoder::new(body));
                    if connected {
                        info!(url = %self.url, "stream connected");
                    }
                    return connected;
                }
                Err(err) => {
                    let (attempt, delay) = {
                        let mut state = self.shared.state.lock();
                        let delay = state.record_failure();
                        (state.current_retries(), delay)
                    };
                    warn!(
                        url = %self.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "stream connect failed, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = wait_closed(shutdown) => return false,
                        _ = self.events.closed() => {
                            self.receiver_dropped();
                            return false;
                        }
                    }
                }
            }
        }
    }

    /// Nobody is left to receive events; stop as if closed.
    fn receiver_dropped(&self) {
        debug!(url = %self.url, "event receiver dropped");
        self.shared.state.lock().mark_closed(CloseReason::Requested);
    }
}

/// Resolves once the session's shutdown flag is raised.
async fn wait_closed(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let closed = *shutdown.borrow_and_update();
        if closed {
            return;
        }
        if shutdown.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("url", &self.url)
            .field("state", &*self.shared.state.lock())
            .finish_non_exhaustive()
    }
}

/// Cloneable handle that closes a [`StreamSession`].
#[derive(Clone)]
pub struct StreamCloser {
    shared: Arc<Shared>,
}

impl StreamCloser {
    /// Close the session.
    ///
    /// Releases the live connection, which wakes a listen loop blocked on a
    /// read or a backoff sleep. The loop then publishes
    /// [`Event::ConnectionClosed`] and stops. Idempotent, and safe to call from
    /// any task at any time, before `listen` included.
    pub fn close(&self) {
        if self.shared.state.lock().mark_closed(CloseReason::Requested) {
            info!("stream connection was closed");
        }
        self.shared.shutdown.send_replace(true);
    }

    /// Whether the session has no live connection.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().is_closed()
    }
}

impl std::fmt::Debug for StreamCloser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCloser").finish_non_exhaustive()
    }
}

/// Receiving side of a session's events.
///
/// Yields events in decode order, ending with exactly one
/// [`Event::ConnectionClosed`], then `None`.
#[derive(Debug)]
pub struct Events {
    receiver: mpsc::Receiver<Event>,
}

impl Events {
    fn new(receiver: mpsc::Receiver<Event>) -> Self {
        Events { receiver }
    }

    /// Receive the next event, or `None` once the session has finished.
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Convert into a [`ReceiverStream`] for use with `StreamExt` combinators.
    pub fn into_stream(self) -> ReceiverStream<Event> {
        ReceiverStream::new(self.receiver)
    }
}

impl Stream for Events {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
