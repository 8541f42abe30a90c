//! Processor pool: one supervisor plus a dynamic set of workers
//!
//! The supervisor ticks once a second and scales the worker set by
//! queue pressure: depth above `queue_limit` spawns a worker (up to
//! `max_workers`), depth below a quarter of `queue_limit` for thirty
//! consecutive ticks retires one (down to one). Retired workers finish
//! their current batch before exiting.
//!
//! Shutdown cancels every worker through the pool's cancellation token,
//! waits out the drain deadline, aborts stragglers, and counts records
//! still queued as lost.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sluice_config::{AggregationPolicy, FilterRule, LogTemplate, Source, TemplateStore};
use sluice_metrics::SourceMetrics;
use sluice_sinks::SinkAdapter;
use sluice_sinks::retry::RetryBuffer;

use crate::queue::{QueueReceiver, QueueSender, SourceQueue};
use crate::worker::{PoolShared, Worker};

/// Supervisor tick period
const SUPERVISOR_TICK: Duration = Duration::from_secs(1);

/// Consecutive low-pressure ticks before retiring a worker
const SCALE_DOWN_TICKS: u32 = 30;

/// Depth below `queue_limit / SCALE_DOWN_DIVISOR` counts as low pressure
const SCALE_DOWN_DIVISOR: usize = 4;

/// Tuning for one source's pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub batch_size: usize,
    pub queue_limit: usize,
    pub max_workers: usize,
    pub max_batch_latency: Duration,
    pub drain_timeout: Duration,
}

impl PoolConfig {
    /// Derive pool tuning from a source definition plus daemon settings.
    pub fn for_source(source: &Source, max_batch_latency: Duration, drain_timeout: Duration) -> Self {
        Self {
            batch_size: source.target.batch_size(),
            queue_limit: source.queue_limit,
            max_workers: source.max_workers.max(1),
            max_batch_latency,
            drain_timeout,
        }
    }
}

/// A running processor pool for one source
pub struct Pool {
    source: Source,
    sender: QueueSender,
    shared: Arc<PoolShared>,
    cancel: CancellationToken,
    supervisor: JoinHandle<()>,
    drain_timeout: Duration,
}

impl Pool {
    /// Create the queue, shared state, and supervisor for a source, and
    /// start the first worker.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        source: Source,
        sink: SinkAdapter,
        metrics: Arc<SourceMetrics>,
        template_store: Arc<TemplateStore>,
        filters: Arc<Vec<FilterRule>>,
        policy: Option<Arc<AggregationPolicy>>,
        template: Option<Arc<LogTemplate>>,
        config: PoolConfig,
    ) -> Self {
        let (sender, receiver) = SourceQueue::bounded(source.queue_capacity(), Arc::clone(&metrics));

        let shared = Arc::new(PoolShared {
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            filters: ArcSwap::new(filters),
            policy: ArcSwapOption::new(policy),
            template: ArcSwapOption::new(template),
            template_store,
            retry: Mutex::new(RetryBuffer::new()),
        });

        let cancel = CancellationToken::new();
        let supervisor = tokio::spawn(supervise(
            receiver,
            Arc::new(sink),
            Arc::clone(&shared),
            Arc::clone(&metrics),
            config.clone(),
            cancel.clone(),
        ));

        tracing::info!(
            source = %source.name,
            batch_size = config.batch_size,
            queue_limit = config.queue_limit,
            max_workers = config.max_workers,
            "processor pool started"
        );

        Self {
            source,
            sender,
            shared,
            cancel,
            supervisor,
            drain_timeout: config.drain_timeout,
        }
    }

    /// The source definition this pool was built from
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Producer handle for the listener side
    pub fn sender(&self) -> QueueSender {
        self.sender.clone()
    }

    /// Swap in a new filter rule set; workers pick it up at their next
    /// batch.
    pub fn update_filters(&self, rules: Arc<Vec<FilterRule>>) {
        self.shared.filters.store(rules);
    }

    /// Swap the aggregation policy; workers pick it up at their next
    /// batch.
    pub fn update_policy(&self, policy: Option<Arc<AggregationPolicy>>) {
        self.shared.policy.store(policy);
    }

    /// Drop the cached learned template (after an explicit template
    /// delete) so the next record learns a fresh one.
    pub fn clear_template(&self) {
        self.shared.template.store(None);
    }

    /// Stop the pool: cancel workers, wait out the drain deadline, and
    /// account records left in the queue as lost.
    pub async fn shutdown(self) {
        self.cancel.cancel();

        // The supervisor performs the drain itself; the extra second
        // covers its own teardown.
        let grace = self.drain_timeout + Duration::from_secs(1);
        if tokio::time::timeout(grace, self.supervisor).await.is_err() {
            tracing::warn!(source = %self.source.name, "pool supervisor exceeded drain grace");
        }

        tracing::info!(source = %self.source.name, "processor pool stopped");
    }
}

/// Supervisor task: scaling loop, then drain.
async fn supervise(
    receiver: QueueReceiver,
    sink: Arc<SinkAdapter>,
    shared: Arc<PoolShared>,
    metrics: Arc<SourceMetrics>,
    config: PoolConfig,
    cancel: CancellationToken,
) {
    let mut workers: Vec<(CancellationToken, JoinHandle<()>)> = Vec::new();
    let mut retired: Vec<JoinHandle<()>> = Vec::new();
    let mut next_worker_id = 0usize;

    let mut spawn_worker = |workers: &mut Vec<(CancellationToken, JoinHandle<()>)>| {
        let token = cancel.child_token();
        let worker = Worker {
            queue: receiver.clone(),
            sink: Arc::clone(&sink),
            shared: Arc::clone(&shared),
            metrics: Arc::clone(&metrics),
            batch_size: config.batch_size,
            max_batch_latency: config.max_batch_latency,
            cancel: token.clone(),
        };
        let id = next_worker_id;
        next_worker_id += 1;
        workers.push((token, tokio::spawn(worker.run(id))));
    };

    spawn_worker(&mut workers);

    let low_threshold = config.queue_limit / SCALE_DOWN_DIVISOR;
    let mut low_ticks = 0u32;

    let mut tick = tokio::time::interval(SUPERVISOR_TICK);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                retired.retain(|handle| !handle.is_finished());
                workers.retain(|(_, handle)| !handle.is_finished());

                // A pool always runs at least one worker
                if workers.is_empty() {
                    spawn_worker(&mut workers);
                }

                let depth = metrics.depth() as usize;

                if depth > config.queue_limit && workers.len() < config.max_workers {
                    spawn_worker(&mut workers);
                    low_ticks = 0;
                    tracing::info!(
                        source = %shared.source_name,
                        depth,
                        workers = workers.len(),
                        "scaled up"
                    );
                } else if depth < low_threshold {
                    low_ticks += 1;
                    if low_ticks >= SCALE_DOWN_TICKS && workers.len() > 1 {
                        let (token, handle) = workers.pop().expect("len > 1");
                        token.cancel();
                        retired.push(handle);
                        low_ticks = 0;
                        tracing::info!(
                            source = %shared.source_name,
                            depth,
                            workers = workers.len(),
                            "scaled down"
                        );
                    }
                } else {
                    low_ticks = 0;
                }
            }
        }
    }

    // Drain: every worker token is a child of the pool token, so they
    // are all cancelled already and finishing their current batch.
    let deadline = tokio::time::Instant::now() + config.drain_timeout;
    let handles = workers
        .into_iter()
        .map(|(_, handle)| handle)
        .chain(retired);
    for mut handle in handles {
        if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
            handle.abort();
        }
    }

    let lost = receiver.drain_remaining();
    if lost > 0 {
        metrics.lost_on_shutdown(lost);
        tracing::warn!(
            source = %shared.source_name,
            lost,
            "records lost at drain deadline"
        );
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
