//! Endpoint lifecycle and reload diffing
//!
//! The mux owns every running endpoint task. `apply` reconciles the
//! running endpoint set against a source snapshot: new endpoints bind
//! and spawn, removed ones are cancelled and awaited, surviving ones
//! atomically swap their routing table. Applying an unchanged snapshot
//! therefore touches no socket.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::routing::RouteTable;
use crate::tcp::TcpEndpoint;
use crate::udp::UdpEndpoint;
use crate::{Ingest, ListenError};
use sluice_config::{Endpoint, Protocol, Source};

/// TCP behavior knobs shared by all TCP endpoints
#[derive(Debug, Clone)]
pub struct TcpTuning {
    /// Idle window after which connections close
    pub idle_timeout: Duration,
}

impl Default for TcpTuning {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
        }
    }
}

struct RunningEndpoint {
    routes: Arc<ArcSwap<RouteTable>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns all listening endpoints and reconciles them on reload
pub struct ListenerMux {
    ingest: Arc<dyn Ingest>,
    tcp: TcpTuning,
    endpoints: HashMap<Endpoint, RunningEndpoint>,
    bind_ip: IpAddr,
}

impl ListenerMux {
    /// Create an empty mux binding endpoints on all interfaces
    pub fn new(ingest: Arc<dyn Ingest>, tcp: TcpTuning) -> Self {
        Self {
            ingest,
            tcp,
            endpoints: HashMap::new(),
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }

    /// Override the bind address (tests bind loopback)
    pub fn with_bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    /// Number of running endpoints
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Reconcile running endpoints against a source snapshot.
    ///
    /// Returns per-endpoint bind failures; an endpoint that fails to
    /// bind is skipped while the rest proceed, so one bad port never
    /// takes down the others.
    pub async fn apply(&mut self, sources: &[Source]) -> Vec<(Endpoint, ListenError)> {
        let desired: HashSet<Endpoint> = sources.iter().map(Source::endpoint).collect();

        // Close endpoints that lost all their sources
        let removed: Vec<Endpoint> = self
            .endpoints
            .keys()
            .filter(|e| !desired.contains(e))
            .copied()
            .collect();
        for endpoint in removed {
            if let Some(running) = self.endpoints.remove(&endpoint) {
                tracing::info!(%endpoint, "closing endpoint");
                running.cancel.cancel();
                let _ = running.task.await;
            }
        }

        let mut failures = Vec::new();

        for endpoint in desired {
            match self.endpoints.get(&endpoint) {
                Some(running) => {
                    // Existing socket survives; only the peer routing
                    // table changes.
                    running
                        .routes
                        .store(Arc::new(RouteTable::build(endpoint, sources)));
                }
                None => {
                    if let Err(e) = self.open_endpoint(endpoint, sources).await {
                        tracing::error!(%endpoint, error = %e, "endpoint bind failed");
                        failures.push((endpoint, e));
                    }
                }
            }
        }

        failures
    }

    /// Stop every endpoint (stop accepting, finish in-flight reads).
    pub async fn shutdown(&mut self) {
        for (endpoint, running) in self.endpoints.drain() {
            tracing::info!(%endpoint, "closing endpoint");
            running.cancel.cancel();
            let _ = running.task.await;
        }
    }

    async fn open_endpoint(
        &mut self,
        endpoint: Endpoint,
        sources: &[Source],
    ) -> Result<(), ListenError> {
        let routes = Arc::new(ArcSwap::new(Arc::new(RouteTable::build(endpoint, sources))));
        let cancel = CancellationToken::new();
        let addr = SocketAddr::new(self.bind_ip, endpoint.port);

        let task = match endpoint.protocol {
            Protocol::Udp => {
                let listener = UdpEndpoint::bind(addr, Arc::clone(&routes), Arc::clone(&self.ingest))?;
                let token = cancel.clone();
                tokio::spawn(async move { listener.run(token).await })
            }
            Protocol::Tcp => {
                let listener = TcpEndpoint::bind(
                    addr,
                    Arc::clone(&routes),
                    Arc::clone(&self.ingest),
                    self.tcp.idle_timeout,
                )
                .await?;
                let token = cancel.clone();
                tokio::spawn(async move { listener.run(token).await })
            }
        };

        tracing::info!(%endpoint, "endpoint opened");
        self.endpoints.insert(
            endpoint,
            RunningEndpoint {
                routes,
                cancel,
                task,
            },
        );

        Ok(())
    }
}

#[cfg(test)]
#[path = "mux_test.rs"]
mod mux_test;
