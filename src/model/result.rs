//! Probe result type and timestamp handling.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single probe result as produced by the backend.
///
/// Results are never mutated after they are received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(default)]
    pub id: String,
    pub config_id: String,
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    /// Elapsed time in seconds.
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    /// Kind-specific payload, see [`crate::model::DnsPayload`] and friends.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl TestResult {
    /// Elapsed time converted to milliseconds.
    pub fn response_time_ms(&self) -> Option<f64> {
        self.response_time.map(|s| s * 1000.0)
    }
}

/// Decode one push-channel message.
pub fn decode_result(text: &str) -> Result<TestResult, serde_json::Error> {
    serde_json::from_str(text)
}

/// Parse a backend timestamp.
///
/// Timestamps carrying an offset are converted to UTC. Timestamps without
/// one are UTC, never local time.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    None
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s)))
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}
