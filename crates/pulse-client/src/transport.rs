//! Transport abstraction for the consumer
//!
//! A transport opens one subscription at a time. The consumer owns the
//! returned stream and drops it to close the connection.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use pulse_core::Sample;

use crate::streaming::StreamResult;

/// Samples (or per-event errors) from one open subscription
pub type EventStream = Pin<Box<dyn Stream<Item = StreamResult<Sample>> + Send>>;

/// Opens subscriptions for a `Consumer`
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a new subscription
    ///
    /// Resolves once the transport reports the stream as open.
    async fn open(&self) -> StreamResult<EventStream>;

    /// Human-readable endpoint for logs
    fn endpoint(&self) -> String {
        "unknown".to_string()
    }
}
