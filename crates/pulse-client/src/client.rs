//! Pulse HTTP client implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{ClientError, Result};
use crate::streaming::{StreamResult, Subscription};
use crate::transport::{EventStream, Transport};

/// Default path of the subscription endpoint
pub const DEFAULT_STREAM_PATH: &str = "/api/sse";

/// Timeout for plain request/response calls such as the health check
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pulse server client
///
/// Opens subscriptions on the server's stream endpoint. Implements
/// `Transport`, so it can drive a `Consumer` directly.
#[derive(Debug, Clone)]
pub struct PulseClient {
    client: Client,
    base_url: Url,
    stream_url: Url,
}

impl PulseClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the server (e.g., "http://localhost:3000")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_STREAM_PATH, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with a custom stream path and connect timeout
    ///
    /// No overall request timeout is set: streams stay open indefinitely.
    pub fn with_config(base_url: &str, stream_path: &str, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;

        let base_url = Url::parse(base_url)?;
        let stream_url = base_url.join(stream_path)?;

        Ok(Self {
            client,
            base_url,
            stream_url,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the stream URL
    pub fn stream_url(&self) -> &Url {
        &self.stream_url
    }

    /// Check server health
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<String> {
        let url = self.base_url.join("/health")?;
        let response = self
            .client
            .get(url)
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::server_error(status.as_u16(), body))
        }
    }

    /// Open a new subscription on the stream endpoint
    pub async fn subscribe(&self) -> StreamResult<Subscription> {
        Subscription::connect(&self.client, self.stream_url.clone()).await
    }
}

#[async_trait]
impl Transport for PulseClient {
    async fn open(&self) -> StreamResult<EventStream> {
        let subscription = self.subscribe().await?;
        debug!(url = %self.stream_url, "Subscription open");
        Ok(Box::pin(subscription))
    }

    fn endpoint(&self) -> String {
        self.stream_url.to_string()
    }
}
