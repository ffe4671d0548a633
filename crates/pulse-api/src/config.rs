//! Producer configuration

use std::time::Duration;

/// Default path of the subscription endpoint
pub const DEFAULT_STREAM_PATH: &str = "/api/sse";

/// Default period between ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Default interval between keep-alive comments
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Settings shared by every subscription served by one router
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Route serving the event stream
    pub path: String,
    /// Period between samples after the immediate first one
    pub tick_interval: Duration,
    /// Interval for `:` keep-alive comments, `None` disables them
    pub keep_alive: Option<Duration>,
    /// Samples buffered per subscription before the ticker waits on the client
    pub channel_capacity: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STREAM_PATH.to_string(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            keep_alive: Some(DEFAULT_KEEP_ALIVE),
            channel_capacity: 16,
        }
    }
}

impl ProducerConfig {
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Option<Duration>) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}
