//! Sink error taxonomy

use std::io;

use thiserror::Error;

/// Errors from sink construction or delivery
#[derive(Debug, Error)]
pub enum SinkError {
    /// Disk I/O failure on the folder sink
    #[error("folder sink I/O on '{path}': {source}")]
    Io {
        /// Path involved
        path: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// HEC endpoint answered with a non-2xx status
    #[error("HEC returned HTTP {status}")]
    HttpStatus {
        /// Response status code
        status: u16,
    },

    /// Connection, TLS, or timeout failure talking to HEC
    #[error("HEC request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// HEC client could not be constructed from the target config
    #[error("invalid HEC target: {reason}")]
    InvalidTarget {
        /// What was wrong
        reason: String,
    },
}

impl SinkError {
    /// Create an Io error with path context
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether delivery should be retried with backoff.
    ///
    /// Retryable: timeouts, connection failures, HTTP 408/429/5xx, and
    /// disk errors other than permission/missing-path failures (a full
    /// disk recovers; an unwritable path does not).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io { source, .. } => !matches!(
                source.kind(),
                io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound
            ),
            Self::HttpStatus { status } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            Self::Network(_) => true,
            Self::InvalidTarget { .. } => false,
        }
    }
}
