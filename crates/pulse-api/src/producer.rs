//! Per-subscription sample ticker
//!
//! Every subscription gets its own ticker task. The task owns the only
//! interval timer for that subscription and pushes encoded samples into a
//! bounded channel whose receiving half becomes the response body. The first
//! sample goes out immediately, then one per tick.
//!
//! The interval lives on the task's stack, so it is released on whichever
//! path ends the loop:
//!
//! - the receiver is dropped (client went away)
//! - a push fails because the output closed mid-send
//! - a sample fails to encode (an error item is pushed first)
//! - the server's shutdown token is cancelled

use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_core::{Sample, SampleError, SampleSource};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ProducerConfig;

/// Shortest period a ticker runs at; a zero interval is raised to this
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Failure that ends a subscription's stream
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Failed to encode sample: {0}")]
    Encode(#[from] SampleError),
}

/// Item carried from the ticker to the response body
pub type FeedItem = Result<String, ProducerError>;

/// Why a ticker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The receiving side was dropped
    SubscriberGone,
    /// Sending into the channel failed
    PushFailed,
    /// A sample could not be encoded
    EncodeFailed,
    /// The server is shutting down
    Shutdown,
}

/// Summary returned by a finished ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerExit {
    /// Samples successfully pushed
    pub ticks: u64,
    pub reason: ExitReason,
}

/// Receiving half of a running ticker
pub struct SampleFeed {
    /// Identifier used in log spans
    pub id: Uuid,
    /// Encoded samples, in production order
    pub receiver: mpsc::Receiver<FeedItem>,
    /// Resolves once the ticker has stopped and released its timer
    pub handle: JoinHandle<TickerExit>,
}

/// Start a ticker for one subscription
pub fn spawn_ticker(
    source: Box<dyn SampleSource>,
    config: &ProducerConfig,
    shutdown: CancellationToken,
) -> SampleFeed {
    let id = Uuid::new_v4();
    if config.tick_interval < MIN_TICK_INTERVAL {
        warn!(tick_interval = ?config.tick_interval, "Tick interval too short, using {:?}", MIN_TICK_INTERVAL);
    }
    let (tx, receiver) = mpsc::channel(config.channel_capacity.max(1));

    let ticker = Ticker {
        source,
        tx,
        shutdown,
        period: config.tick_interval.max(MIN_TICK_INTERVAL),
        last_timestamp: None,
    };

    let span = info_span!("subscription", %id);
    let handle = tokio::spawn(ticker.run().instrument(span));

    SampleFeed {
        id,
        receiver,
        handle,
    }
}

struct Ticker {
    source: Box<dyn SampleSource>,
    tx: mpsc::Sender<FeedItem>,
    shutdown: CancellationToken,
    period: Duration,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Ticker {
    async fn run(mut self) -> TickerExit {
        debug!(period_ms = self.period.as_millis() as u64, "Ticker started");

        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0u64;
        let reason = loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break ExitReason::Shutdown,
                _ = self.tx.closed() => break ExitReason::SubscriberGone,
                _ = interval.tick() => {}
            }

            match self.push().await {
                Ok(()) => ticks += 1,
                Err(reason) => break reason,
            }
        };
        drop(interval);

        debug!(ticks, ?reason, "Ticker stopped");
        TickerExit { ticks, reason }
    }

    async fn push(&mut self) -> Result<(), ExitReason> {
        let sample = self.next_sample();

        let data = match sample.encode() {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, value = sample.value, "Failed to encode sample");
                // Waits for room so the body always ends with the error.
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => {}
                    sent = self.tx.send(Err(ProducerError::Encode(e))) => {
                        if sent.is_err() {
                            warn!("Failed to push encode error: output closed");
                        }
                    }
                }
                return Err(ExitReason::EncodeFailed);
            }
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(ExitReason::Shutdown),
            sent = self.tx.send(Ok(data)) => match sent {
                Ok(()) => {
                    debug!(value = sample.value, timestamp = %sample.timestamp_string(), "Sample pushed");
                    Ok(())
                }
                Err(_) => {
                    warn!("Failed to push sample: output closed");
                    Err(ExitReason::PushFailed)
                }
            },
        }
    }

    /// Draw the next sample, never letting the timestamp go backwards
    fn next_sample(&mut self) -> Sample {
        let mut sample = self.source.next_sample();
        if let Some(last) = self.last_timestamp {
            if sample.timestamp < last {
                sample.timestamp = last;
            }
        }
        self.last_timestamp = Some(sample.timestamp);
        sample
    }
}
