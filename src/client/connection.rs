//! Connection state shared between a listen loop and its closers.
//!
//! The state is owned by a [`StreamSession`](crate::client::StreamSession)
//! behind a mutex; the listen loop and any [`StreamCloser`] touch it only
//! through the methods here, which keep the retry counter and reader handle
//! consistent with the closed flag.
//!
//! [`StreamCloser`]: crate::client::StreamCloser

use crate::client::utils::linear_backoff;
use crate::client::CloseReason;
use std::time::Duration;

/// Closed flag, retry accounting and the live reader of one stream session.
///
/// `R` is the reader for the current connection. While the listen loop is
/// blocked on a read it holds the reader itself and the slot here is empty.
#[derive(Debug)]
pub struct ConnectionState<R> {
    /// No live connection
    closed: bool,
    /// Set once the session reached its terminal state
    reason: Option<CloseReason>,
    /// Backoff unit between reconnects
    wait: Duration,
    /// Failed connects tolerated before the session closes
    max_retries: u32,
    /// Consecutive failed connects so far
    current_retries: u32,
    /// Reader for the live connection
    reader: Option<R>,
}

impl<R> ConnectionState<R> {
    /// New state, not yet connected.
    pub fn new(wait: Duration, max_retries: u32) -> Self {
        Self {
            closed: true,
            reason: None,
            wait,
            max_retries,
            current_retries: 0,
            reader: None,
        }
    }

    /// Whether there is no live connection.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Why the session closed, once it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.reason
    }

    /// Whether the session reached its terminal state.
    pub fn is_terminal(&self) -> bool {
        self.reason.is_some()
    }

    /// Whether another failed connect would exceed the retry budget.
    pub fn retries_exhausted(&self) -> bool {
        self.current_retries >= self.max_retries
    }

    /// Consecutive failed connects so far.
    pub fn current_retries(&self) -> u32 {
        self.current_retries
    }

    /// Maximum consecutive failed connects.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Change the backoff unit.
    pub fn set_wait(&mut self, wait: Duration) {
        self.wait = wait;
    }

    /// Change the retry budget.
    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.max_retries = max_retries;
    }

    /// Move the session to its terminal state.
    ///
    /// Releases the reader and resets the retry counter. Only the first call
    /// records a reason; later calls change nothing and return `false`.
    pub fn mark_closed(&mut self, reason: CloseReason) -> bool {
        self.closed = true;
        self.reader = None;
        self.current_retries = 0;
        if self.reason.is_some() {
            return false;
        }
        self.reason = Some(reason);
        true
    }

    /// Record one failed connect and return the delay before the next one.
    pub fn record_failure(&mut self) -> Duration {
        self.current_retries = self.current_retries.saturating_add(1);
        linear_backoff(self.wait, self.current_retries)
    }

    /// Store the reader of a fresh connection.
    ///
    /// After a terminal close the reader is dropped instead and `false` is
    /// returned.
    pub fn record_connect(&mut self, reader: R) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.closed = false;
        self.current_retries = 0;
        self.reader = Some(reader);
        true
    }

    /// Take the reader out for a read.
    pub fn take_reader(&mut self) -> Option<R> {
        self.reader.take()
    }

    /// Hand a reader back after a successful read.
    ///
    /// Dropped, returning `false`, if the session closed meanwhile.
    pub fn restore_reader(&mut self, reader: R) -> bool {
        if self.closed {
            return false;
        }
        self.reader = Some(reader);
        true
    }
}
