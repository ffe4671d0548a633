//! Error types for sample encoding and decoding

use thiserror::Error;

/// Result type for sample operations
pub type SampleResult<T> = Result<T, SampleError>;

/// Errors that can occur while encoding or decoding a sample
#[derive(Debug, Error)]
pub enum SampleError {
    /// Value is not finite or falls outside `[0, 100)`
    #[error("Sample value {0} is outside [0, 100)")]
    OutOfRange(f64),

    /// Serialization to the wire record failed
    #[error("Failed to encode sample: {0}")]
    Encode(#[source] serde_json::Error),

    /// The wire record could not be parsed
    #[error("Failed to decode sample: {0}")]
    Decode(#[source] serde_json::Error),
}
