//! Sluice - Control Plane
//!
//! The [`ControlPlane`] owns everything: the persisted stores, the
//! listener multiplexer, one processor pool per source, and the metrics
//! registry. It is the single writer for configuration changes and the
//! single point that reconciles running state against desired state.
//!
//! Components are wired through narrow capabilities instead of mutual
//! references: listeners get an [`sluice_sources::Ingest`] handle
//! ([`IngestRouter`]) that routes records into per-source queues; pools
//! get a sink adapter; nothing holds a reference back to the plane.
//!
//! # Lifecycle
//!
//! `start` spawns pools first (so queues exist), then binds listeners.
//! `stop` reverses that: listeners close first (no new data), then
//! pools drain up to the deadline. `reload` re-reads `sources.json` and
//! reconciles: unchanged sources keep their pool and socket, changed
//! ones are replaced, removed ones drain and go away.

mod error;
mod ingest;
mod plane;

pub use error::ControlError;
pub use ingest::IngestRouter;
pub use plane::{ControlPlane, MetricsReport};
