//! Streaming support for pulse subscriptions
//!
//! Provides SSE (Server-Sent Events) parsing and a `Stream` of samples over
//! one HTTP connection. Reconnection lives one level up, in the consumer.
//!
//! # Example
//!
//! ```no_run
//! use pulse_client::PulseClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PulseClient::new("http://localhost:3000")?;
//! let mut subscription = client.subscribe().await?;
//!
//! while let Some(event) = subscription.next().await {
//!     match event {
//!         Ok(sample) => println!("{:.2} at {}", sample.value, sample.timestamp_string()),
//!         Err(e) if e.is_parse() => eprintln!("Skipping event: {}", e),
//!         Err(e) => {
//!             eprintln!("Stream error: {}", e);
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod parser;
mod subscription;
mod types;

pub use parser::SseParser;
pub use subscription::Subscription;
pub use types::{StreamError, StreamResult};
