//! Utility functions for the Gitter client.
//!
//! - Stream endpoint construction
//! - Reconnect backoff calculation

use crate::error::{GitterError, Result};
use std::time::Duration;
use url::Url;

/// Build the message stream URL for a room.
///
/// The room id is appended as a single percent-encoded path segment, giving
/// `<stream-base>/rooms/<roomId>/chatMessages`. A trailing slash on the base
/// is optional.
///
/// # Examples
///
/// ```
/// use gitter_http::client::stream_url;
///
/// let url = stream_url("https://stream.gitter.im/v1/", "xyz").unwrap();
/// assert_eq!(url.as_str(), "https://stream.gitter.im/v1/rooms/xyz/chatMessages");
/// ```
pub fn stream_url(base: &str, room_id: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| GitterError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(&["rooms", room_id, "chatMessages"]);
    Ok(url)
}

/// Linear backoff delay calculation
///
/// Returns `unit * attempt`. The first retry waits one unit, the second two,
/// and so on; growth is intentionally not exponential.
pub fn linear_backoff(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(attempt)
}
