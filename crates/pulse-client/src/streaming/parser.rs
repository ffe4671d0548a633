//! SSE (Server-Sent Events) parser
//!
//! Parses the SSE wire format into samples.

use std::time::Duration;

use pulse_core::Sample;
use tracing::trace;

use super::types::{StreamError, StreamResult};

/// SSE parser state
#[derive(Debug, Default)]
pub struct SseParser {
    /// Buffer for incomplete lines
    buffer: Vec<u8>,
    /// Current event data being accumulated
    data_buffer: String,
    /// Whether a `data` field was seen for the current event
    has_data: bool,
    /// Current event type (if any)
    event_type: Option<String>,
    /// Last event ID (if any)
    last_id: Option<String>,
    /// Reconnection time advertised by the server (if any)
    retry: Option<Duration>,
}

impl SseParser {
    /// Create a new SSE parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Last event ID seen on this stream
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// Reconnection time advertised by the server
    ///
    /// Recorded for diagnostics only; the consumer keeps its own fixed delay.
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    /// Feed bytes into the parser and extract any complete events
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamResult<Sample>> {
        let mut events = Vec::new();

        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<_>>();
            let line = &line[..line.len() - 1]; // Remove trailing \n

            // Handle \r\n line endings
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        events
    }

    /// Process a single line of SSE data
    fn process_line(&mut self, line: &[u8]) -> Option<StreamResult<Sample>> {
        // Empty line signals end of event
        if line.is_empty() {
            return self.dispatch_event();
        }

        // Comment line (keepalive)
        if line.starts_with(b":") {
            trace!("SSE keepalive/comment");
            return None;
        }

        let line_str = match std::str::from_utf8(line) {
            Ok(s) => s,
            Err(_) => {
                return Some(Err(StreamError::Parse("Invalid UTF-8 in SSE line".into())));
            }
        };

        // Split on first colon
        let (field, value) = match line_str.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line_str, ""),
        };

        match field {
            "data" => {
                // Multiple data lines are joined with newlines
                if self.has_data {
                    self.data_buffer.push('\n');
                }
                self.data_buffer.push_str(value);
                self.has_data = true;
            }
            "event" => {
                self.event_type = Some(value.to_string());
            }
            "id" => {
                self.last_id = Some(value.to_string());
            }
            "retry" => match value.parse::<u64>() {
                Ok(ms) => self.retry = Some(Duration::from_millis(ms)),
                Err(_) => trace!("SSE invalid retry: {}", value),
            },
            _ => {
                // Unknown fields are ignored
                trace!("SSE unknown field: {}", field);
            }
        }

        None
    }

    /// Dispatch the accumulated event
    fn dispatch_event(&mut self) -> Option<StreamResult<Sample>> {
        let data = std::mem::take(&mut self.data_buffer);
        let has_data = std::mem::replace(&mut self.has_data, false);
        let event_type = self.event_type.take();

        if !has_data {
            return None;
        }

        // Only unnamed or "message" events carry samples
        if let Some(name) = event_type.filter(|name| name != "message") {
            trace!("SSE skipping named event: {}", name);
            return None;
        }

        match Sample::decode(&data) {
            Ok(sample) => Some(Ok(sample)),
            Err(e) => {
                let preview: String = data.chars().take(100).collect();
                let ellipsis = if preview.len() < data.len() { "..." } else { "" };
                Some(Err(StreamError::Parse(format!(
                    "{} (data: {}{})",
                    e, preview, ellipsis
                ))))
            }
        }
    }
}
