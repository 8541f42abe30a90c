//! Bounded per-source record queue
//!
//! Multi-producer (listener tasks) / multi-consumer (worker tasks) FIFO.
//! Enqueue never blocks: a full queue drops the record and counts it,
//! which is the pipeline's backpressure mechanism. The shared metrics
//! handle carries the depth gauge so the supervisor and `metrics()` see
//! the same number.

use std::sync::Arc;

use crossfire::{MAsyncRx, MAsyncTx, TryRecvError, TrySendError};
use tokio::time::Instant;

use sluice_event::LogRecord;
use sluice_metrics::SourceMetrics;

/// Handle pair for one source's queue
pub struct SourceQueue;

impl SourceQueue {
    /// Create a bounded queue with the given capacity.
    pub fn bounded(
        capacity: usize,
        metrics: Arc<SourceMetrics>,
    ) -> (QueueSender, QueueReceiver) {
        let (tx, rx) = crossfire::mpmc::bounded_async::<LogRecord>(capacity);
        (
            QueueSender {
                tx,
                metrics: Arc::clone(&metrics),
            },
            QueueReceiver { rx, metrics },
        )
    }
}

/// Result of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Record accepted
    Queued,
    /// Queue full; record dropped and counted
    Dropped,
    /// All consumers are gone (source shutting down)
    Closed,
}

/// Producer handle held by listeners
#[derive(Clone)]
pub struct QueueSender {
    tx: MAsyncTx<LogRecord>,
    metrics: Arc<SourceMetrics>,
}

impl QueueSender {
    /// Enqueue without blocking. Every call counts toward `events_in`;
    /// drops additionally count toward `events_dropped_queue_full`.
    pub fn push(&self, record: LogRecord) -> PushOutcome {
        self.metrics.event_in();
        match self.tx.try_send(record) {
            Ok(()) => {
                self.metrics.queue_push();
                PushOutcome::Queued
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.dropped_queue_full();
                PushOutcome::Dropped
            }
            Err(TrySendError::Disconnected(_)) => PushOutcome::Closed,
        }
    }
}

/// Consumer handle held by workers; clones share the same queue.
#[derive(Clone)]
pub struct QueueReceiver {
    rx: MAsyncRx<LogRecord>,
    metrics: Arc<SourceMetrics>,
}

impl QueueReceiver {
    /// Wait for the next record. `None` means all senders are gone.
    pub async fn recv(&self) -> Option<LogRecord> {
        match self.rx.recv().await {
            Ok(record) => {
                self.metrics.queue_pop();
                Some(record)
            }
            Err(_) => None,
        }
    }

    /// Wait for the next record until `deadline`. `Ok(None)` means the
    /// channel closed; `Err(())` means the deadline passed first.
    pub async fn recv_until(&self, deadline: Instant) -> Result<Option<LogRecord>, ()> {
        match tokio::time::timeout_at(deadline, self.rx.recv()).await {
            Ok(Ok(record)) => {
                self.metrics.queue_pop();
                Ok(Some(record))
            }
            Ok(Err(_)) => Ok(None),
            Err(_) => Err(()),
        }
    }

    /// Drain and discard everything still queued, returning the count.
    /// Used after the drain deadline to account lost records.
    pub fn drain_remaining(&self) -> u64 {
        let mut count = 0;
        loop {
            match self.rx.try_recv() {
                Ok(_) => {
                    self.metrics.queue_pop();
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        count
    }
}
