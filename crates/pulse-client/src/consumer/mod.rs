//! Reconnecting stream consumer
//!
//! A `Consumer` keeps a best-effort live subscription, exposes the latest
//! sample and connection status through `ConsumerView`, and reconnects after
//! a fixed delay whenever the transport fails.
//!
//! # Example
//!
//! ```no_run
//! use pulse_client::{Consumer, ConsumerConfig, PulseClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PulseClient::new("http://localhost:3000")?;
//! let consumer = Consumer::spawn(client, ConsumerConfig::default());
//! consumer.enable();
//!
//! let mut views = consumer.watch();
//! while views.changed().await.is_ok() {
//!     let view = views.borrow_and_update().clone();
//!     println!("[{}] {}", view.status_label(), view.headline());
//! }
//! # Ok(())
//! # }
//! ```

mod driver;
mod state;

pub use state::{
    ConnectionStatus, ConsumerState, ConsumerView, PARSE_ERROR_MESSAGE, RECONNECTING_MESSAGE,
    WAITING_PLACEHOLDER,
};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::transport::Transport;
use driver::{Command, Driver};

/// Default wait before re-subscribing after a transport error
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Consumer settings
///
/// The reconnect policy is a fixed delay: no backoff, no jitter, no retry cap.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Wait between a transport error and the next subscription attempt
    pub reconnect_delay: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ConsumerConfig {
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Handle to a running consumer
///
/// Starts disabled. Dropping the handle stops the event loop and closes any
/// open subscription.
pub struct Consumer {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<ConsumerView>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Consumer {
    /// Start the consumer's event loop on the current runtime
    pub fn spawn(transport: impl Transport, config: ConsumerConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ConsumerView::default());
        let shutdown = CancellationToken::new();

        let driver = Driver::new(
            Arc::new(transport),
            config,
            commands_rx,
            view_tx,
            shutdown.clone(),
        );
        let task = tokio::spawn(driver.run());

        Self {
            commands: commands_tx,
            view: view_rx,
            shutdown,
            task: Some(task),
        }
    }

    /// Start subscribing; no-op if already enabled
    pub fn enable(&self) {
        self.send(Command::Enable);
    }

    /// Close any subscription and cancel any pending reconnect
    pub fn disable(&self) {
        self.send(Command::Disable);
    }

    /// Flip between enabled and disabled
    pub fn toggle(&self) {
        self.send(Command::Toggle);
    }

    /// Current snapshot
    pub fn view(&self) -> ConsumerView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn watch(&self) -> watch::Receiver<ConsumerView> {
        self.view.clone()
    }

    /// Wait until the view satisfies `predicate`
    ///
    /// Returns `None` if the consumer stopped first.
    pub async fn wait_for(&self, predicate: impl FnMut(&ConsumerView) -> bool) -> Option<ConsumerView> {
        let mut view = self.view.clone();
        let matched = view.wait_for(predicate).await.ok()?;
        Some(matched.clone())
    }

    /// Stop the event loop and wait for it to release its resources
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!(?command, "Consumer already stopped; command dropped");
        }
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
