//! Sluice - Processor Pipeline
//!
//! The middle of the data plane: listeners push raw records into a
//! per-source bounded queue; a pool of workers drains it, filters and
//! aggregates, and hands batches to the source's sink.
//!
//! # Components
//!
//! - [`SourceQueue`] - bounded MPMC queue with drop-on-full backpressure
//! - [`filter`] - exclusion rules (drop when all enabled rules match)
//! - [`aggregate`] - collapse duplicate records within a batch by key
//! - [`Pool`] - supervisor plus 1..max_workers worker tasks per source,
//!   scaled by queue pressure, drained on shutdown
//!
//! # Scaling
//!
//! The supervisor ticks at 1 Hz. Queue depth above `queue_limit` spawns
//! a worker (up to `max_workers`); depth below `queue_limit / 4` for 30
//! consecutive ticks retires one (down to a single worker). Workers
//! finish their current batch before exiting, so no in-flight records
//! are lost to scaling decisions.

pub mod aggregate;
pub mod filter;
mod pool;
mod queue;
mod worker;

pub use pool::{Pool, PoolConfig};
pub use queue::{PushOutcome, QueueReceiver, QueueSender, SourceQueue};
pub use worker::ProcessedRecord;
