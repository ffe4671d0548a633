//! Pulse Client Library
//!
//! Subscribes to a pulse server's sample stream and keeps a live, reconnecting
//! view of the latest sample.
//!
//! # Example
//!
//! ```rust,no_run
//! use pulse_client::{Consumer, ConsumerConfig, PulseClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PulseClient::new("http://localhost:3000")?;
//!     let consumer = Consumer::spawn(client, ConsumerConfig::default());
//!     consumer.enable();
//!
//!     let view = consumer.wait_for(|v| v.latest.is_some()).await;
//!     println!("{:?}", view.map(|v| v.display_value()));
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides utilities for integration testing:
//!
//! ```rust,ignore
//! use pulse_client::testing::TestServer;
//! use pulse_api::{create_router, AppState};
//!
//! let state = AppState::default();
//! let server = TestServer::start(create_router(state.clone()), state.shutdown_token()).await?;
//! let mut subscription = server.client.subscribe().await?;
//! ```

mod client;
pub mod consumer;
mod error;
pub mod streaming;
pub mod testing;
pub mod transport;

pub use client::{PulseClient, DEFAULT_STREAM_PATH};
pub use consumer::{ConnectionStatus, Consumer, ConsumerConfig, ConsumerView};
pub use error::{ClientError, Result};
pub use transport::{EventStream, Transport};

// Re-export streaming types for convenience
pub use streaming::{StreamError, StreamResult, Subscription};

// Re-export core types for convenience
pub use pulse_core::{Sample, SampleKind};
