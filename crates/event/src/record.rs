//! Raw log record as received from the network

use std::time::SystemTime;

/// A single raw record, one UDP datagram or one TCP line.
///
/// The payload is held as a `String`; non-UTF-8 input is decoded lossily
/// by the listener before construction and counted there.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Raw payload with any trailing newline already trimmed
    pub payload: String,

    /// When the listener received this record
    pub received_at: SystemTime,
}

impl LogRecord {
    /// Create a record received now
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            received_at: SystemTime::now(),
        }
    }

    /// Receive time as unix seconds (0 for pre-epoch clocks)
    pub fn received_unix(&self) -> u64 {
        self.received_at
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
