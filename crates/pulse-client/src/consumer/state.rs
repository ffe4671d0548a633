//! Consumer state machine
//!
//! All presentation state lives in one `ConsumerState`, mutated only through
//! the transition methods below and only from the consumer's event loop.
//!
//! ```text
//!   Disabled --enable--> Connecting --open--> Connected
//!                            ^                   |
//!                            |              transport error
//!                      reconnect due             v
//!                            +------------- Errored
//!
//!   any enabled state --disable--> Disabled
//! ```

use pulse_core::Sample;
use serde::Serialize;

/// Shown while a reconnect is pending
pub const RECONNECTING_MESSAGE: &str = "Connection lost. Attempting to reconnect...";

/// Shown after an event payload failed to parse
pub const PARSE_ERROR_MESSAGE: &str = "Failed to parse data from server";

/// Shown in place of a value before the first sample arrives
pub const WAITING_PLACEHOLDER: &str = "Waiting for data...";

/// Connection status of a consumer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Not subscribed and not trying to
    #[default]
    Disabled,
    /// Subscription requested, transport not open yet
    Connecting,
    /// Transport open
    Connected,
    /// Transport failed, reconnect pending
    Errored,
}

/// Cohesive consumer state
#[derive(Debug, Clone, Default)]
pub struct ConsumerState {
    status: ConnectionStatus,
    latest: Option<Sample>,
    error: Option<String>,
    reconnects: u64,
}

impl ConsumerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_enabled(&self) -> bool {
        self.status != ConnectionStatus::Disabled
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.latest.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reconnects scheduled since the consumer was created
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Disabled -> Connecting
    ///
    /// Returns `true` if a subscription should be opened; `false` when already
    /// enabled.
    pub fn enable(&mut self) -> bool {
        if self.is_enabled() {
            return false;
        }
        self.status = ConnectionStatus::Connecting;
        self.error = None;
        true
    }

    /// Any enabled state -> Disabled
    ///
    /// Clears the latest value and any error. Returns `true` if the consumer
    /// was enabled.
    pub fn disable(&mut self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.status = ConnectionStatus::Disabled;
        self.latest = None;
        self.error = None;
        true
    }

    /// Errored -> Connecting, once the reconnect delay has passed
    ///
    /// Returns `false` if the consumer is no longer waiting to reconnect.
    pub fn reconnect_due(&mut self) -> bool {
        if self.status != ConnectionStatus::Errored {
            return false;
        }
        self.status = ConnectionStatus::Connecting;
        true
    }

    /// Connecting -> Connected
    pub fn opened(&mut self) -> bool {
        if self.status != ConnectionStatus::Connecting {
            return false;
        }
        self.status = ConnectionStatus::Connected;
        self.error = None;
        true
    }

    /// A sample arrived: it replaces the previous one and clears any error
    pub fn sample_received(&mut self, sample: Sample) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.latest = Some(sample);
        self.error = None;
        true
    }

    /// An event failed to parse; the connection stays as it is
    pub fn parse_failed(&mut self) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.error = Some(PARSE_ERROR_MESSAGE.to_string());
        true
    }

    /// Connecting/Connected -> Errored
    ///
    /// Returns `true` exactly when the caller must schedule one reconnect.
    pub fn transport_failed(&mut self) -> bool {
        match self.status {
            ConnectionStatus::Connecting | ConnectionStatus::Connected => {
                self.status = ConnectionStatus::Errored;
                self.error = Some(RECONNECTING_MESSAGE.to_string());
                self.reconnects += 1;
                true
            }
            ConnectionStatus::Disabled | ConnectionStatus::Errored => false,
        }
    }

    /// Snapshot for the presentation layer
    pub fn view(&self) -> ConsumerView {
        ConsumerView {
            status: self.status,
            enabled: self.is_enabled(),
            connected: self.is_connected(),
            latest: self.latest.clone(),
            error: self.error.clone(),
            reconnects: self.reconnects,
        }
    }
}

/// What a host UI renders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsumerView {
    pub status: ConnectionStatus,
    pub enabled: bool,
    pub connected: bool,
    pub latest: Option<Sample>,
    pub error: Option<String>,
    pub reconnects: u64,
}

impl ConsumerView {
    /// Latest value, if any
    pub fn value(&self) -> Option<f64> {
        self.latest.as_ref().map(|s| s.value)
    }

    /// Latest value with two decimals, or the waiting placeholder
    pub fn display_value(&self) -> String {
        match self.value() {
            Some(value) => format!("{:.2}", value),
            None => WAITING_PLACEHOLDER.to_string(),
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.connected {
            "Connected"
        } else {
            "Disconnected"
        }
    }

    /// Label for the enable/disable control
    pub fn toggle_label(&self) -> &'static str {
        if self.enabled {
            "Stop Connection"
        } else {
            "Start Connection"
        }
    }

    /// Main line: the error if there is one, the value otherwise
    pub fn headline(&self) -> String {
        match &self.error {
            Some(error) => error.clone(),
            None => self.display_value(),
        }
    }
}
