//! TCP endpoint
//!
//! Connections are bound to a source by peer IP at accept time and keep
//! that binding for their life. The stream is LF-delimited (CRLF
//! tolerated); each line is one record. Lines over the size cap are
//! consumed and counted without being queued. Connections idle past the
//! inactivity window are closed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::routing::RouteTable;
use crate::{Ingest, ListenError, MAX_TCP_RECORD};
use sluice_config::SourceId;
use sluice_event::LogRecord;

/// Read buffer per connection
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// A bound TCP listening endpoint
pub struct TcpEndpoint {
    listener: TcpListener,
    routes: Arc<ArcSwap<RouteTable>>,
    ingest: Arc<dyn Ingest>,
    idle_timeout: Duration,
    unknown_peers: Arc<AtomicU64>,
}

impl TcpEndpoint {
    /// Bind the endpoint socket; bind failures surface synchronously.
    pub async fn bind(
        addr: SocketAddr,
        routes: Arc<ArcSwap<RouteTable>>,
        ingest: Arc<dyn Ingest>,
        idle_timeout: Duration,
    ) -> Result<Self, ListenError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| ListenError::Bind {
            endpoint: format!("TCP:{}", addr.port()),
            source: e,
        })?;

        Ok(Self {
            listener,
            routes,
            ingest,
            idle_timeout,
            unknown_peers: Arc::new(AtomicU64::new(0)),
        })
    }

    /// The bound local address (useful with port 0)
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Connections rejected because no source owned the peer
    pub fn unknown_peer_count(&self) -> u64 {
        self.unknown_peers.load(Ordering::Relaxed)
    }

    /// Accept loop; exits on cancellation. In-flight connections get a
    /// child token so they finish their current read before closing.
    pub async fn run(self, cancel: CancellationToken) {
        let local = self.listener.local_addr().ok();
        tracing::info!(addr = ?local, "TCP endpoint listening");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.accept_connection(stream, peer, &cancel),
                    Err(e) => {
                        tracing::warn!(error = %e, "TCP accept error");
                    }
                },
            }
        }

        tracing::info!(addr = ?local, "TCP endpoint stopped");
    }

    fn accept_connection(&self, stream: TcpStream, peer: SocketAddr, cancel: &CancellationToken) {
        // The source binding is fixed at accept time for the life of
        // the connection; a reload does not re-route live connections.
        let source_id = match self.routes.load().lookup(peer.ip()) {
            Some(id) => id.clone(),
            None => {
                self.unknown_peers.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(peer = %peer.ip(), "connection from unknown peer closed");
                return;
            }
        };

        let handler = ConnectionHandler {
            source_id,
            ingest: Arc::clone(&self.ingest),
            idle_timeout: self.idle_timeout,
            peer,
            cancel: cancel.child_token(),
        };

        tokio::spawn(async move {
            if let Err(e) = handler.handle(stream).await {
                tracing::debug!(peer = %peer, error = %e, "connection error");
            }
        });
    }
}

/// Reads one connection's line stream
struct ConnectionHandler {
    source_id: SourceId,
    ingest: Arc<dyn Ingest>,
    idle_timeout: Duration,
    peer: SocketAddr,
    cancel: CancellationToken,
}

/// Outcome of one bounded line read
enum ReadLine {
    /// A complete line is in the buffer
    Line,
    /// The line exceeded the cap and was consumed
    TooLong,
    /// Peer closed the connection
    Eof,
}

impl ConnectionHandler {
    async fn handle(self, stream: TcpStream) -> std::io::Result<()> {
        tracing::debug!(peer = %self.peer, source_id = %self.source_id, "connection opened");

        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, stream);
        let mut line = Vec::with_capacity(1024);

        loop {
            let read = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                read = tokio::time::timeout(
                    self.idle_timeout,
                    read_bounded_line(&mut reader, &mut line, MAX_TCP_RECORD),
                ) => match read {
                    Ok(result) => result?,
                    Err(_) => {
                        tracing::debug!(peer = %self.peer, "connection idle, closing");
                        break;
                    }
                },
            };

            match read {
                ReadLine::Line => {
                    // The newline is already consumed; CRLF leaves a
                    // trailing '\r' to trim here.
                    let bytes = line.strip_suffix(b"\r").unwrap_or(&line);
                    if bytes.is_empty() {
                        continue;
                    }

                    // Non-UTF-8 lines are kept, decoded lossily
                    let payload = String::from_utf8_lossy(bytes);
                    self.ingest
                        .enqueue(&self.source_id, LogRecord::new(payload.into_owned()));
                }
                ReadLine::TooLong => {
                    self.ingest.parse_failure(&self.source_id);
                    tracing::debug!(
                        peer = %self.peer,
                        max = MAX_TCP_RECORD,
                        "oversize line dropped"
                    );
                }
                ReadLine::Eof => break,
            }
        }

        tracing::debug!(peer = %self.peer, "connection closed");
        Ok(())
    }
}

/// Read one LF-terminated line into `line` (cleared first), never
/// holding more than `max` bytes. An over-limit line is consumed to its
/// newline and reported as [`ReadLine::TooLong`]. At EOF, buffered
/// unterminated data counts as a final line.
async fn read_bounded_line<R>(
    reader: &mut R,
    line: &mut Vec<u8>,
    max: usize,
) -> std::io::Result<ReadLine>
where
    R: AsyncBufReadExt + Unpin,
{
    line.clear();
    let mut overflow = false;

    loop {
        let (consumed, done) = {
            let available = reader.fill_buf().await?;

            if available.is_empty() {
                let result = if overflow {
                    Some(ReadLine::TooLong)
                } else if line.is_empty() {
                    Some(ReadLine::Eof)
                } else {
                    Some(ReadLine::Line)
                };
                (0, result)
            } else {
                match available.iter().position(|&b| b == b'\n') {
                    Some(pos) => {
                        let result = if overflow || line.len() + pos > max {
                            Some(ReadLine::TooLong)
                        } else {
                            line.extend_from_slice(&available[..pos]);
                            Some(ReadLine::Line)
                        };
                        (pos + 1, result)
                    }
                    None => {
                        if !overflow {
                            if line.len() + available.len() > max {
                                overflow = true;
                                line.clear();
                            } else {
                                line.extend_from_slice(available);
                            }
                        }
                        (available.len(), None)
                    }
                }
            }
        };

        reader.consume(consumed);
        if let Some(result) = done {
            return Ok(result);
        }
    }
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
