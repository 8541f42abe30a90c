//! Per-source counters and gauges

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters and gauges for one source.
///
/// Counters only ever increase; `queue_depth` and `workers_active` are
/// gauges maintained by the queue and the pool supervisor.
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Records accepted off the network
    pub events_in: AtomicU64,

    /// Records dropped because the source queue was full
    pub events_dropped_queue_full: AtomicU64,

    /// Records dropped by filter rules
    pub events_dropped_filter: AtomicU64,

    /// Records dropped before queueing (oversize, empty, undecodable)
    pub events_dropped_parse: AtomicU64,

    /// Records still queued when the drain deadline expired
    pub events_lost_shutdown: AtomicU64,

    /// Records delivered to the sink
    pub events_delivered: AtomicU64,

    /// Bytes handed to the sink in delivered batches
    pub bytes_delivered: AtomicU64,

    /// Sink delivery retry attempts
    pub retries: AtomicU64,

    /// Batches discarded from a full retry buffer
    pub retry_discarded: AtomicU64,

    /// Current queue depth (gauge)
    pub queue_depth: AtomicU64,

    /// Current worker count (gauge)
    pub workers_active: AtomicU64,

    /// Most recent delivery or listener error
    last_error: Mutex<Option<String>>,
}

impl SourceMetrics {
    /// Create a zeroed metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a record accepted off the network
    #[inline]
    pub fn event_in(&self) {
        self.events_in.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a drop due to a full queue
    #[inline]
    pub fn dropped_queue_full(&self) {
        self.events_dropped_queue_full.fetch_add(1, Ordering::Relaxed);
    }

    /// Record drops due to filter rules
    #[inline]
    pub fn dropped_filter(&self, n: u64) {
        self.events_dropped_filter.fetch_add(n, Ordering::Relaxed);
    }

    /// Record a drop before queueing (oversize, undecodable)
    #[inline]
    pub fn dropped_parse(&self) {
        self.events_dropped_parse.fetch_add(1, Ordering::Relaxed);
    }

    /// Record records lost at the drain deadline
    #[inline]
    pub fn lost_on_shutdown(&self, n: u64) {
        self.events_lost_shutdown.fetch_add(n, Ordering::Relaxed);
    }

    /// Record a delivered batch
    #[inline]
    pub fn delivered(&self, records: u64, bytes: u64) {
        self.events_delivered.fetch_add(records, Ordering::Relaxed);
        self.bytes_delivered.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record one delivery retry attempt
    #[inline]
    pub fn retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch discarded from a full retry buffer
    #[inline]
    pub fn retry_discarded(&self) {
        self.retry_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Queue depth gauge: one record enqueued
    #[inline]
    pub fn queue_push(&self) {
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Queue depth gauge: one record dequeued
    #[inline]
    pub fn queue_pop(&self) {
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current queue depth
    #[inline]
    pub fn depth(&self) -> u64 {
        self.queue_depth.load(Ordering::Relaxed)
    }

    /// Worker gauge: one worker started
    #[inline]
    pub fn worker_started(&self) {
        self.workers_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Worker gauge: one worker exited
    #[inline]
    pub fn worker_stopped(&self) {
        self.workers_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current worker count
    #[inline]
    pub fn workers(&self) -> u64 {
        self.workers_active.load(Ordering::Relaxed)
    }

    /// Record the most recent error (delivery or listener)
    pub fn set_last_error(&self, error: impl Into<String>) {
        *self.last_error.lock().expect("last_error lock") = Some(error.into());
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            workers_active: self.workers_active.load(Ordering::Relaxed),
            events_in: self.events_in.load(Ordering::Relaxed),
            events_dropped_queue_full: self.events_dropped_queue_full.load(Ordering::Relaxed),
            events_dropped_filter: self.events_dropped_filter.load(Ordering::Relaxed),
            events_dropped_parse: self.events_dropped_parse.load(Ordering::Relaxed),
            events_lost_shutdown: self.events_lost_shutdown.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            bytes_delivered: self.bytes_delivered.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            retry_discarded: self.retry_discarded.load(Ordering::Relaxed),
            last_error: self.last_error.lock().expect("last_error lock").clone(),
        }
    }
}

/// Serializable point-in-time view of one source's metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSnapshot {
    pub queue_depth: u64,
    pub workers_active: u64,
    pub events_in: u64,
    pub events_dropped_queue_full: u64,
    pub events_dropped_filter: u64,
    pub events_dropped_parse: u64,
    pub events_lost_shutdown: u64,
    pub events_delivered: u64,
    pub bytes_delivered: u64,
    pub retries: u64,
    pub retry_discarded: u64,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = SourceMetrics::new();
        metrics.event_in();
        metrics.event_in();
        metrics.dropped_queue_full();
        metrics.delivered(10, 2048);

        let snap = metrics.snapshot();
        assert_eq!(snap.events_in, 2);
        assert_eq!(snap.events_dropped_queue_full, 1);
        assert_eq!(snap.events_delivered, 10);
        assert_eq!(snap.bytes_delivered, 2048);
    }

    #[test]
    fn queue_gauge_tracks_push_pop() {
        let metrics = SourceMetrics::new();
        metrics.queue_push();
        metrics.queue_push();
        metrics.queue_pop();
        assert_eq!(metrics.depth(), 1);
    }

    #[test]
    fn worker_gauge_tracks_lifecycle() {
        let metrics = SourceMetrics::new();
        metrics.worker_started();
        metrics.worker_started();
        assert_eq!(metrics.workers(), 2);
        metrics.worker_stopped();
        assert_eq!(metrics.workers(), 1);
    }

    #[test]
    fn last_error_is_captured() {
        let metrics = SourceMetrics::new();
        assert_eq!(metrics.snapshot().last_error, None);
        metrics.set_last_error("HEC returned 403");
        assert_eq!(
            metrics.snapshot().last_error.as_deref(),
            Some("HEC returned 403")
        );
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let metrics = SourceMetrics::new();
        metrics.event_in();
        let json = serde_json::to_string(&metrics.snapshot()).unwrap();
        assert!(json.contains("\"events_in\":1"));
    }
}
