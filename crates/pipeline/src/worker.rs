//! Worker task: drain, process, deliver
//!
//! Each worker repeats one cycle: block for the first record, accumulate
//! until the batch is full or the batch latency deadline passes, then
//! filter, aggregate, and deliver. Cancellation is observed between
//! cycles and during accumulation, so a cancelled worker still finishes
//! and delivers its current batch.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use arc_swap::{ArcSwap, ArcSwapOption};
use tokio_util::sync::CancellationToken;

use sluice_config::{AggregationPolicy, FilterRule, LogTemplate, SourceId, TemplateStore};
use sluice_event::{CanonicalLog, FieldMap, LogRecord, extract_fields};
use sluice_metrics::SourceMetrics;
use sluice_sinks::SinkAdapter;
use sluice_sinks::retry::{RetryBuffer, deliver_with_backoff};

use crate::aggregate;
use crate::filter;
use crate::queue::QueueReceiver;

/// A record after extraction, ready for filtering and aggregation
#[derive(Debug, Clone)]
pub struct ProcessedRecord {
    /// Original payload
    pub raw: String,

    /// Extracted fields (shared by filter and aggregation)
    pub fields: FieldMap,

    /// Receive time in unix seconds
    pub received_unix: u64,
}

/// State shared by all workers of one source's pool.
///
/// Filter rules and the aggregation policy are swapped in by the control
/// plane on updates; workers load a fresh snapshot at each batch start.
pub(crate) struct PoolShared {
    pub source_id: SourceId,
    pub source_name: String,
    pub filters: ArcSwap<Vec<FilterRule>>,
    pub policy: ArcSwapOption<AggregationPolicy>,
    pub template: ArcSwapOption<LogTemplate>,
    pub template_store: Arc<TemplateStore>,
    pub retry: Mutex<RetryBuffer>,
}

pub(crate) struct Worker {
    pub queue: QueueReceiver,
    pub sink: Arc<SinkAdapter>,
    pub shared: Arc<PoolShared>,
    pub metrics: Arc<SourceMetrics>,
    pub batch_size: usize,
    pub max_batch_latency: Duration,
    pub cancel: CancellationToken,
}

impl Worker {
    pub(crate) async fn run(self, worker_id: usize) {
        self.metrics.worker_started();
        tracing::debug!(
            source = %self.shared.source_name,
            worker_id,
            "worker started"
        );

        loop {
            let first = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                record = self.queue.recv() => record,
            };

            let Some(first) = first else {
                break;
            };

            let batch = self.collect_batch(first).await;
            self.process_batch(batch).await;

            if self.cancel.is_cancelled() {
                break;
            }
        }

        self.metrics.worker_stopped();
        tracing::debug!(
            source = %self.shared.source_name,
            worker_id,
            "worker stopped"
        );
    }

    /// Accumulate up to `batch_size` records or until the latency
    /// deadline since the first record, whichever comes first.
    async fn collect_batch(&self, first: LogRecord) -> Vec<LogRecord> {
        let mut batch = Vec::with_capacity(self.batch_size.min(4096));
        batch.push(first);

        let deadline = tokio::time::Instant::now() + self.max_batch_latency;

        while batch.len() < self.batch_size {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = self.queue.recv_until(deadline) => match next {
                    Ok(Some(record)) => batch.push(record),
                    // Channel closed or deadline passed: close the batch
                    Ok(None) | Err(()) => break,
                },
            }
        }

        batch
    }

    /// Filter, aggregate, and deliver one batch.
    async fn process_batch(&self, batch: Vec<LogRecord>) {
        let rules = self.shared.filters.load_full();
        let policy = self.shared.policy.load_full();
        let time = unix_now();

        let mut kept = Vec::with_capacity(batch.len());
        let mut filtered = 0u64;

        for record in batch {
            let fields = extract_fields(&record.payload);
            self.learn_template(&record.payload, &fields);

            if filter::should_drop(&rules, &fields) {
                filtered += 1;
                continue;
            }

            kept.push(ProcessedRecord {
                received_unix: record.received_unix(),
                raw: record.payload,
                fields,
            });
        }

        if filtered > 0 {
            self.metrics.dropped_filter(filtered);
        }

        let canonical: Vec<CanonicalLog> = match policy.as_deref() {
            Some(p) if p.is_active() => {
                aggregate::collapse(p, kept, time, &self.shared.source_name)
            }
            _ => kept
                .into_iter()
                .map(|r| CanonicalLog::new(time, &r.raw, &self.shared.source_name))
                .collect(),
        };

        self.deliver(canonical).await;
    }

    /// Learn the source's template from the first record that yields
    /// fields. Persistence failures are logged and retried on the next
    /// record.
    fn learn_template(&self, raw: &str, fields: &FieldMap) {
        if fields.is_empty() || self.shared.template.load().is_some() {
            return;
        }

        let Some(template) = LogTemplate::learn(raw) else {
            return;
        };

        match self
            .shared
            .template_store
            .set(&self.shared.source_id, template)
        {
            Ok(stored) => self.shared.template.store(Some(stored)),
            Err(err) => tracing::warn!(
                source = %self.shared.source_name,
                error = %err,
                "failed to persist learned template"
            ),
        }
    }

    /// Deliver parked batches first, then the current batch.
    async fn deliver(&self, batch: Vec<CanonicalLog>) {
        if batch.is_empty() {
            return;
        }

        // Older parked batches go out ahead of new data. Stop flushing
        // on the first failure so a dead sink doesn't spin here.
        while let Some(parked) = self.take_parked() {
            if !self.try_deliver(parked).await {
                break;
            }
        }

        self.try_deliver(batch).await;
    }

    fn take_parked(&self) -> Option<Vec<CanonicalLog>> {
        self.shared.retry.lock().expect("retry buffer lock").take()
    }

    /// Returns true on success. A retryable failure parks the batch; a
    /// permanent one drops it. Both record `last_error`.
    async fn try_deliver(&self, batch: Vec<CanonicalLog>) -> bool {
        let records = batch.len() as u64;

        match deliver_with_backoff(&self.sink, &batch, || self.metrics.retry()).await {
            Ok(bytes) => {
                self.metrics.delivered(records, bytes);
                true
            }
            Err(err) => {
                self.metrics.set_last_error(err.to_string());

                if err.is_retryable() {
                    tracing::warn!(
                        source = %self.shared.source_name,
                        records,
                        error = %err,
                        "delivery attempts exhausted, parking batch"
                    );
                    let evicted = {
                        let mut buffer = self.shared.retry.lock().expect("retry buffer lock");
                        buffer.park(batch)
                    };
                    if evicted.is_some() {
                        self.metrics.retry_discarded();
                    }
                } else {
                    tracing::error!(
                        source = %self.shared.source_name,
                        records,
                        error = %err,
                        "permanent delivery failure, dropping batch"
                    );
                }
                false
            }
        }
    }
}

/// Current time as unix seconds
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
