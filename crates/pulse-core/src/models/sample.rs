//! Sample model and its wire record

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SampleError, SampleResult};

/// Kind tag carried by every sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    /// Uniformly distributed random value
    #[default]
    Random,
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKind::Random => f.write_str("random"),
        }
    }
}

/// One unit of streamed data
///
/// On the wire a sample is a compact JSON record:
///
/// ```text
/// {"value":42.5,"timestamp":"2024-01-01T00:00:00.000Z","kind":"random"}
/// ```
///
/// Older producers used `number` and `type` as field names; both are accepted
/// when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Value in `[0, 100)`
    #[serde(alias = "number")]
    pub value: f64,
    /// Instant the sample was generated
    #[serde(with = "iso8601_millis")]
    pub timestamp: DateTime<Utc>,
    /// Sample type tag
    #[serde(alias = "type", default)]
    pub kind: SampleKind,
}

impl Sample {
    /// Inclusive lower bound of `value`
    pub const MIN_VALUE: f64 = 0.0;
    /// Exclusive upper bound of `value`
    pub const MAX_VALUE: f64 = 100.0;

    /// Create a random-kind sample
    ///
    /// The timestamp is truncated to millisecond precision so the in-memory
    /// sample matches what the wire record carries.
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            timestamp: timestamp.trunc_subsecs(3),
            kind: SampleKind::Random,
        }
    }

    /// Create a sample stamped with the current time
    pub fn now(value: f64) -> Self {
        Self::new(value, Utc::now())
    }

    /// Whether `value` is finite and inside `[0, 100)`
    pub fn is_in_range(&self) -> bool {
        self.value.is_finite() && (Self::MIN_VALUE..Self::MAX_VALUE).contains(&self.value)
    }

    /// Timestamp as it appears on the wire
    pub fn timestamp_string(&self) -> String {
        iso8601_millis::format(&self.timestamp)
    }

    /// Encode into the `data:` payload of one stream event
    pub fn encode(&self) -> SampleResult<String> {
        if !self.is_in_range() {
            return Err(SampleError::OutOfRange(self.value));
        }
        serde_json::to_string(self).map_err(SampleError::Encode)
    }

    /// Decode the `data:` payload of one stream event
    pub fn decode(data: &str) -> SampleResult<Self> {
        serde_json::from_str(data).map_err(SampleError::Decode)
    }
}

/// ISO-8601 UTC with millisecond precision and a `Z` suffix
mod iso8601_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
