//! Types for streaming subscriptions

use thiserror::Error;

/// Errors that can occur during streaming
#[derive(Debug, Error)]
pub enum StreamError {
    /// HTTP/connection error
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// Failed to parse one SSE event
    #[error("Parse error: {0}")]
    Parse(String),

    /// Server returned an error
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Response is not an event stream
    #[error("Unexpected content type: {0}")]
    ContentType(String),

    /// Stream was closed by the server
    #[error("Stream closed")]
    Closed,

    /// Any other transport failure
    #[error("Transport error: {0}")]
    Transport(String),
}

impl StreamError {
    /// Parse failures affect a single event; everything else ends the stream
    pub fn is_parse(&self) -> bool {
        matches!(self, StreamError::Parse(_))
    }
}

/// Result type for streaming operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;
