//! Main Gitter HTTP client.
//!
//! `GitterClient` holds the access token and configuration, issues
//! authenticated requests, and creates room stream sessions.
//!
//! # Examples
//!
//! ```ignore
//! use gitter_http::{Event, GitterClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GitterClient::new("YOUR_ACCESS_TOKEN");
//!     let (session, mut events) = client.stream("ROOM_ID")?;
//!     tokio::spawn(session.listen());
//!
//!     while let Some(event) = events.next().await {
//!         if let Event::MessageReceived(message) = event {
//!             println!("{}", message.text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use crate::client::config::ClientConfig;
use crate::client::subscription::{BodyStream, Events, StreamSession, StreamTransport};
use crate::client::utils::stream_url;
use crate::error::{GitterError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// The Gitter HTTP client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct GitterClient {
    client: reqwest::Client,
    token: SecretString,
    config: Arc<ClientConfig>,
}

impl GitterClient {
    /// Create a client with default configuration.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_config(token, ClientConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(token: impl Into<String>, config: ClientConfig) -> Self {
        GitterClient {
            client: reqwest::Client::new(),
            token: SecretString::new(token.into()),
            config: Arc::new(config),
        }
    }

    /// Issue an authenticated GET and return the raw response.
    ///
    /// The response status is not checked.
    pub async fn get_response(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(url, error = %e, "request failed");
                GitterError::Http(e.to_string())
            })?;
        Ok(response)
    }

    /// Create a stream session for a room's messages.
    ///
    /// The session uses the configured reconnect wait and retry limit; both
    /// can be overridden on the returned session before listening.
    pub fn stream(&self, room_id: &str) -> Result<(StreamSession, Events)> {
        let url = stream_url(&self.config.stream_base_url, room_id)?;
        let transport: Arc<dyn StreamTransport> = Arc::new(self.clone());
        Ok(StreamSession::new(
            url,
            transport,
            self.config.stream_wait(),
            self.config.stream_max_retries,
        ))
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl StreamTransport for GitterClient {
    async fn open(&self, url: &str) -> Result<BodyStream> {
        let response = self.get_response(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GitterError::Status(status.as_u16()));
        }
        Ok(Box::pin(response.bytes_stream().map_err(GitterError::from)))
    }
}

impl std::fmt::Debug for GitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitterClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
