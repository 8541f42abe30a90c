//! Delivery retry with exponential backoff and the park buffer
//!
//! Retryable failures back off 1 s, 2 s, 4 s, ... capped at 60 s for at
//! most [`MAX_ATTEMPTS`] total attempts. A batch that exhausts its
//! attempts is parked in the source's [`RetryBuffer`]; when the buffer
//! is full the oldest batch is discarded so memory stays bounded.

use std::collections::VecDeque;
use std::time::Duration;

use sluice_event::CanonicalLog;

use crate::{SinkAdapter, SinkError};

/// First backoff delay
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Multiplier between consecutive delays
pub const BACKOFF_FACTOR: u32 = 2;

/// Backoff ceiling
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Total delivery attempts per batch before parking
pub const MAX_ATTEMPTS: usize = 5;

/// Parked batches kept per source before discarding the oldest
pub const RETRY_BUFFER_CAP: usize = 1_000;

/// The backoff delay before retry attempt `retry` (0-based).
pub fn backoff_delay(retry: u32) -> Duration {
    INITIAL_BACKOFF
        .saturating_mul(BACKOFF_FACTOR.saturating_pow(retry))
        .min(MAX_BACKOFF)
}

/// Deliver a batch, retrying retryable failures with backoff.
///
/// `on_retry` fires once per retry attempt (for metrics). Returns the
/// delivered byte count, or the last error once attempts are exhausted
/// or a permanent failure occurs; callers classify via
/// [`SinkError::is_retryable`].
pub async fn deliver_with_backoff(
    sink: &SinkAdapter,
    batch: &[CanonicalLog],
    mut on_retry: impl FnMut(),
) -> Result<u64, SinkError> {
    let mut attempt = 0usize;

    loop {
        match sink.deliver(batch).await {
            Ok(bytes) => return Ok(bytes),
            Err(err) => {
                attempt += 1;
                if !err.is_retryable() || attempt >= MAX_ATTEMPTS {
                    return Err(err);
                }

                let delay = backoff_delay(attempt as u32 - 1);
                tracing::warn!(
                    sink = sink.kind(),
                    attempt,
                    max_attempts = MAX_ATTEMPTS,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "delivery failed, backing off"
                );
                on_retry();
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Bounded FIFO of batches that exhausted their delivery attempts.
#[derive(Debug, Default)]
pub struct RetryBuffer {
    batches: VecDeque<Vec<CanonicalLog>>,
}

impl RetryBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parked batches
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// True when nothing is parked
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Park a batch. Returns the evicted oldest batch when the buffer
    /// was already at capacity.
    pub fn park(&mut self, batch: Vec<CanonicalLog>) -> Option<Vec<CanonicalLog>> {
        let evicted = if self.batches.len() >= RETRY_BUFFER_CAP {
            self.batches.pop_front()
        } else {
            None
        };
        self.batches.push_back(batch);
        evicted
    }

    /// Take the oldest parked batch for redelivery
    pub fn take(&mut self) -> Option<Vec<CanonicalLog>> {
        self.batches.pop_front()
    }
}
