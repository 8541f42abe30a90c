//! UDP endpoint
//!
//! One datagram is one record. The socket is shared by every source on
//! the endpoint; the peer address picks the source. Datagrams from
//! unknown peers are dropped silently and counted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use socket2::{Domain, Protocol as SockProtocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::routing::RouteTable;
use crate::{Ingest, ListenError, MAX_UDP_RECORD};
use sluice_event::LogRecord;

/// Receive buffer requested from the kernel (absorbs bursts)
const SOCKET_RECV_BUFFER: usize = 4 * 1024 * 1024;

/// A bound UDP listening endpoint
pub struct UdpEndpoint {
    socket: UdpSocket,
    routes: Arc<ArcSwap<RouteTable>>,
    ingest: Arc<dyn Ingest>,
    unknown_peers: AtomicU64,
}

impl UdpEndpoint {
    /// Bind the endpoint socket. Binding happens here, not in `run`, so
    /// the caller observes bind failures synchronously.
    pub fn bind(
        addr: SocketAddr,
        routes: Arc<ArcSwap<RouteTable>>,
        ingest: Arc<dyn Ingest>,
    ) -> Result<Self, ListenError> {
        let socket = create_socket(addr).map_err(|e| ListenError::Bind {
            endpoint: format!("UDP:{}", addr.port()),
            source: e,
        })?;

        Ok(Self {
            socket,
            routes,
            ingest,
            unknown_peers: AtomicU64::new(0),
        })
    }

    /// The bound local address (useful with port 0)
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Datagrams dropped because no source owned the peer
    pub fn unknown_peer_count(&self) -> u64 {
        self.unknown_peers.load(Ordering::Relaxed)
    }

    /// Receive loop; exits on cancellation.
    pub async fn run(self, cancel: CancellationToken) {
        let local = self.socket.local_addr().ok();
        tracing::info!(addr = ?local, "UDP endpoint listening");

        let mut buf = vec![0u8; MAX_UDP_RECORD];

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                result = self.socket.recv_from(&mut buf) => match result {
                    Ok((len, peer)) => self.handle_datagram(&buf[..len], peer),
                    Err(e) => {
                        tracing::debug!(error = %e, "UDP recv error");
                    }
                },
            }
        }

        tracing::info!(addr = ?local, "UDP endpoint stopped");
    }

    fn handle_datagram(&self, data: &[u8], peer: SocketAddr) {
        let routes = self.routes.load();
        let Some(source_id) = routes.lookup(peer.ip()) else {
            self.unknown_peers.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(peer = %peer.ip(), "datagram from unknown peer dropped");
            return;
        };

        // Non-UTF-8 payloads are kept, decoded lossily
        let payload = String::from_utf8_lossy(data);

        let payload = trim_trailing_newline(&payload);
        if payload.is_empty() {
            return;
        }

        self.ingest
            .enqueue(source_id, LogRecord::new(payload.to_owned()));
    }
}

/// Trim one trailing LF or CRLF (some senders newline-terminate
/// datagrams).
pub(crate) fn trim_trailing_newline(payload: &str) -> &str {
    payload
        .strip_suffix("\r\n")
        .or_else(|| payload.strip_suffix('\n'))
        .unwrap_or(payload)
}

/// UDP socket with SO_REUSEADDR and an enlarged receive buffer.
fn create_socket(addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(SockProtocol::UDP))?;
    socket.set_reuse_address(true)?;

    if let Err(e) = socket.set_recv_buffer_size(SOCKET_RECV_BUFFER) {
        tracing::warn!(error = %e, requested = SOCKET_RECV_BUFFER, "failed to set SO_RCVBUF");
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    UdpSocket::from_std(socket.into())
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
