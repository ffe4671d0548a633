//! Consumer event loop
//!
//! A single task owns the `ConsumerState`, the open transport stream and the
//! pending reconnect timer. User commands, transport events and the timer
//! are all handled here, one at a time, so nothing else ever touches them.

use std::pin::Pin;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::StreamExt;
use pulse_core::Sample;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{ConsumerState, ConsumerView};
use super::ConsumerConfig;
use crate::streaming::{StreamError, StreamResult};
use crate::transport::{EventStream, Transport};

/// Requests from the consumer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Enable,
    Disable,
    Toggle,
}

/// The single transport-side resource held at any moment
enum Link {
    /// Nothing open, nothing scheduled
    Idle,
    /// Waiting for the transport to report the stream open
    Opening(BoxFuture<'static, StreamResult<EventStream>>),
    /// Stream open
    Open(EventStream),
    /// Reconnect scheduled
    Backoff(Pin<Box<Sleep>>),
}

enum Step {
    Command(Command),
    Opened(StreamResult<EventStream>),
    Event(Option<StreamResult<Sample>>),
    ReconnectDue,
    Shutdown,
}

pub(crate) struct Driver {
    state: ConsumerState,
    transport: Arc<dyn Transport>,
    config: ConsumerConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    view: watch::Sender<ConsumerView>,
    shutdown: CancellationToken,
    link: Link,
}

impl Driver {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        config: ConsumerConfig,
        commands: mpsc::UnboundedReceiver<Command>,
        view: watch::Sender<ConsumerView>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state: ConsumerState::new(),
            transport,
            config,
            commands,
            view,
            shutdown,
            link: Link::Idle,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(endpoint = %self.transport.endpoint(), "Consumer loop started");

        loop {
            let step = self.next_step().await;
            if matches!(step, Step::Shutdown) {
                break;
            }
            self.handle(step);
            self.publish();
        }

        self.link = Link::Idle;
        debug!("Consumer loop stopped");
    }

    async fn next_step(&mut self) -> Step {
        let shutdown = &self.shutdown;
        let commands = &mut self.commands;

        // Commands win ties so a disable is never overtaken by a due timer.
        match &mut self.link {
            Link::Idle => tokio::select! {
                biased;
                _ = shutdown.cancelled() => Step::Shutdown,
                cmd = commands.recv() => Step::from_command(cmd),
            },
            Link::Opening(opening) => tokio::select! {
                biased;
                _ = shutdown.cancelled() => Step::Shutdown,
                cmd = commands.recv() => Step::from_command(cmd),
                result = opening => Step::Opened(result),
            },
            Link::Open(stream) => tokio::select! {
                biased;
                _ = shutdown.cancelled() => Step::Shutdown,
                cmd = commands.recv() => Step::from_command(cmd),
                event = stream.next() => Step::Event(event),
            },
            Link::Backoff(timer) => tokio::select! {
                biased;
                _ = shutdown.cancelled() => Step::Shutdown,
                cmd = commands.recv() => Step::from_command(cmd),
                _ = timer.as_mut() => Step::ReconnectDue,
            },
        }
    }

    fn handle(&mut self, step: Step) {
        match step {
            Step::Command(Command::Enable) => self.enable(),
            Step::Command(Command::Disable) => self.disable(),
            Step::Command(Command::Toggle) => {
                if self.state.is_enabled() {
                    self.disable();
                } else {
                    self.enable();
                }
            }
            Step::Opened(Ok(stream)) => {
                if self.state.opened() {
                    info!(endpoint = %self.transport.endpoint(), "Connected");
                    self.link = Link::Open(stream);
                }
            }
            Step::Opened(Err(e)) => self.fail(e),
            Step::Event(Some(Ok(sample))) => {
                debug!(value = sample.value, timestamp = %sample.timestamp_string(), "Sample received");
                self.state.sample_received(sample);
            }
            Step::Event(Some(Err(e))) if e.is_parse() => {
                warn!(error = %e, "Failed to parse event");
                self.state.parse_failed();
            }
            Step::Event(Some(Err(e))) => self.fail(e),
            Step::Event(None) => self.fail(StreamError::Closed),
            Step::ReconnectDue => {
                self.link = Link::Idle;
                // Re-check: only an errored, still-enabled consumer reconnects.
                if self.state.reconnect_due() {
                    info!("Reconnecting");
                    self.open();
                }
            }
            Step::Shutdown => {}
        }
    }

    fn enable(&mut self) {
        if self.state.enable() {
            info!(endpoint = %self.transport.endpoint(), "Consumer enabled");
            self.open();
        }
    }

    fn disable(&mut self) {
        if self.state.disable() {
            // Drops the open stream, the pending open or the reconnect timer.
            self.link = Link::Idle;
            info!("Consumer disabled");
        }
    }

    fn open(&mut self) {
        let transport = self.transport.clone();
        self.link = Link::Opening(Box::pin(async move { transport.open().await }));
    }

    fn fail(&mut self, error: StreamError) {
        warn!(error = %error, "Transport error");
        self.link = Link::Idle;

        if self.state.transport_failed() {
            debug!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Reconnect scheduled"
            );
            self.link = Link::Backoff(Box::pin(time::sleep(self.config.reconnect_delay)));
        }
    }

    fn publish(&self) {
        let next = self.state.view();
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl Step {
    fn from_command(command: Option<Command>) -> Self {
        match command {
            Some(command) => Step::Command(command),
            // Every handle is gone
            None => Step::Shutdown,
        }
    }
}
