//! Sluice - Metrics
//!
//! Internal metrics for the ingestion pipeline.
//!
//! # Design Principles
//!
//! - **Lock-free counters**: every counter and gauge is an atomic;
//!   `last_error` is the only mutex, touched off the hot path
//! - **Handle pattern**: components hold `Arc<SourceMetrics>` handles
//!   from the shared [`MetricsRegistry`]; the registry outlives any
//!   individual listener or worker, so the control plane can always
//!   collect a consistent snapshot
//! - **Accounting identity**: `events_in` equals delivered + dropped +
//!   still-queued + in-flight at any instant, which is why queue depth
//!   is maintained here as a gauge rather than read from the channel
//!
//! System-wide CPU/memory/disk/network gauges come from [`SystemMonitor`].

mod registry;
mod source_metrics;
mod system;

pub use registry::MetricsRegistry;
pub use source_metrics::{SourceMetrics, SourceSnapshot};
pub use system::{SystemMonitor, SystemSnapshot};
