//! Canonical event format delivered to sinks
//!
//! A `CanonicalLog` always serializes to exactly three keys:
//! `time`, `event`, `source`. If the original payload parsed as a JSON
//! object, `event` is that object; otherwise it is the raw string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `event` half of a canonical log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// Payload parsed as a JSON object
    Object(serde_json::Map<String, Value>),

    /// Payload kept as the raw string
    Text(String),
}

impl EventPayload {
    /// Parse a raw payload: a JSON object becomes `Object`, anything
    /// else (including JSON arrays and scalars) stays `Text`.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self::Object(map),
            _ => Self::Text(raw.to_owned()),
        }
    }

    /// The parsed object, if this payload is one
    pub fn as_object(&self) -> Option<&serde_json::Map<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            Self::Text(_) => None,
        }
    }
}

/// Normalized `{time, event, source}` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLog {
    /// Unix seconds when the batch was processed
    pub time: u64,

    /// Parsed JSON object or raw string
    pub event: EventPayload,

    /// Display name of the source this record arrived on
    pub source: String,
}

impl CanonicalLog {
    /// Build a canonical log from a raw payload
    pub fn new(time: u64, raw: &str, source: impl Into<String>) -> Self {
        Self {
            time,
            event: EventPayload::parse(raw),
            source: source.into(),
        }
    }

    /// Serialize to a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> String {
        // CanonicalLog contains no map keys that can fail to serialize
        serde_json::to_string(self).expect("canonical log serializes")
    }
}
