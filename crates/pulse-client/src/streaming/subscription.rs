//! Subscription implementation

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use pulse_core::Sample;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::parser::SseParser;
use super::types::{StreamError, StreamResult};

/// An open event stream delivering samples from the server
///
/// Implements `Stream<Item = Result<Sample, StreamError>>`. Parse errors are
/// yielded per event and do not end the stream; a connection error does.
/// Dropping the subscription closes the connection.
pub struct Subscription {
    /// Stream URL
    url: Url,

    /// The underlying byte stream from reqwest
    byte_stream: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,

    /// SSE parser
    parser: SseParser,

    /// Parsed events not yet handed out
    pending: VecDeque<StreamResult<Sample>>,

    /// Set once the byte stream ended or failed
    finished: bool,
}

impl Subscription {
    /// Open a subscription on `url`
    ///
    /// Resolves once the response headers arrive, i.e. when the stream is open.
    pub async fn connect(http_client: &Client, url: Url) -> StreamResult<Self> {
        debug!("Connecting to SSE stream: {}", url);

        let response = http_client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(StreamError::Server { status, message });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with("text/event-stream") {
            return Err(StreamError::ContentType(content_type.to_string()));
        }

        Ok(Self {
            url,
            byte_stream: Box::pin(response.bytes_stream()),
            parser: SseParser::new(),
            pending: VecDeque::new(),
            finished: false,
        })
    }

    /// Get the stream URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the next event from the stream
    ///
    /// Returns `None` when the server ends the stream.
    pub async fn next(&mut self) -> Option<StreamResult<Sample>> {
        <Self as StreamExt>::next(self).await
    }

    fn finish(&mut self, outcome: &str) {
        self.finished = true;
        debug!(
            url = %self.url,
            outcome,
            last_event_id = ?self.parser.last_event_id(),
            retry_hint_ms = ?self.parser.retry().map(|r| r.as_millis() as u64),
            "Subscription stream closed"
        );
    }
}

impl Stream for Subscription {
    type Item = StreamResult<Sample>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }

            if this.finished {
                return Poll::Ready(None);
            }

            match this.byte_stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    // May yield nothing until an event is complete
                    this.pending.extend(this.parser.feed(&bytes));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finish("failed");
                    return Poll::Ready(Some(Err(StreamError::Connection(e))));
                }
                Poll::Ready(None) => {
                    this.finish("ended");
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
