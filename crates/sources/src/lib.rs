//! Sluice - Listener Multiplexer
//!
//! One listening socket per distinct `(protocol, port)` endpoint, shared
//! by every source bound to it. Incoming datagrams and connections are
//! demultiplexed to a source by peer IP through an atomically swapped
//! routing table, then handed to the pipeline through the [`Ingest`]
//! capability.
//!
//! # Reload
//!
//! [`ListenerMux::apply`] diffs the configured endpoint set against the
//! running one: removed endpoints stop accepting and finish in-flight
//! reads, new ones bind, surviving ones only swap their routing table -
//! an unchanged source set touches no socket.
//!
//! # Failure model
//!
//! A bind failure is fatal for that endpoint only and is reported to the
//! caller; other endpoints keep running. Per-connection read errors
//! close that connection. Unknown peers are dropped and counted on the
//! endpoint.

mod mux;
mod routing;
mod tcp;
#[cfg(test)]
mod test_support;
mod udp;

pub use mux::{ListenerMux, TcpTuning};
pub use routing::RouteTable;
pub use tcp::TcpEndpoint;
pub use udp::UdpEndpoint;

use sluice_config::SourceId;
use sluice_event::LogRecord;
use thiserror::Error;

/// Maximum UDP record size (largest UDP payload over IPv4)
pub const MAX_UDP_RECORD: usize = 65_507;

/// Maximum TCP line length
pub const MAX_TCP_RECORD: usize = 1024 * 1024;

/// Capability handed to listeners for pushing records into the
/// pipeline. The control plane implements it on top of the per-source
/// queues; enqueue never blocks (full queues drop and count inside).
pub trait Ingest: Send + Sync + 'static {
    /// Route a decoded record into its source's queue.
    fn enqueue(&self, source_id: &SourceId, record: LogRecord);

    /// Count a record dropped before queueing (oversize line).
    fn parse_failure(&self, source_id: &SourceId);
}

/// Listener errors
#[derive(Debug, Error)]
pub enum ListenError {
    /// Could not bind the endpoint's socket
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        /// Endpoint description, e.g. "UDP:5140"
        endpoint: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// I/O error outside a specific connection
    #[error("listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}
