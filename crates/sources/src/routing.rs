//! Peer-IP routing table
//!
//! Each endpoint owns one table mapping peer address to source id. The
//! table is immutable; reload builds a new one and swaps it in through
//! `ArcSwap`, so lookups on the hot path never take a lock.

use std::collections::HashMap;
use std::net::IpAddr;

use sluice_config::{Endpoint, Source, SourceId};

/// Immutable `peer ip -> source id` map for one endpoint
#[derive(Debug, Default)]
pub struct RouteTable {
    peers: HashMap<IpAddr, SourceId>,
}

impl RouteTable {
    /// Build the table for `endpoint` from the full source set; only
    /// sources bound to this endpoint contribute entries. Validation
    /// guarantees no two sources claim the same peer here.
    pub fn build(endpoint: Endpoint, sources: &[Source]) -> Self {
        let mut peers = HashMap::new();
        for source in sources.iter().filter(|s| s.endpoint() == endpoint) {
            for ip in &source.source_ips {
                peers.insert(*ip, source.id.clone());
            }
        }
        Self { peers }
    }

    /// The source owning this peer, if any
    pub fn lookup(&self, peer: IpAddr) -> Option<&SourceId> {
        self.peers.get(&peer)
    }

    /// Number of routed peers
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// True when no peers are routed
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_config::{Compression, Protocol, Target};

    fn source(name: &str, ips: &[&str], port: u16, protocol: Protocol) -> Source {
        Source {
            id: SourceId::from(name),
            name: name.into(),
            source_ips: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
            port,
            protocol,
            target: Target::Folder {
                path: "/out".into(),
                batch_size: 1,
                compression: Compression::None,
            },
            queue_limit: 100,
            max_workers: 1,
        }
    }

    #[test]
    fn routes_peers_of_matching_endpoint_only() {
        let sources = vec![
            source("a", &["10.0.0.1", "10.0.0.2"], 5140, Protocol::Udp),
            source("b", &["10.0.0.3"], 5140, Protocol::Udp),
            source("c", &["10.0.0.4"], 5141, Protocol::Udp),
            source("d", &["10.0.0.5"], 5140, Protocol::Tcp),
        ];

        let table = RouteTable::build(
            Endpoint {
                protocol: Protocol::Udp,
                port: 5140,
            },
            &sources,
        );

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.lookup("10.0.0.1".parse().unwrap()),
            Some(&SourceId::from("a"))
        );
        assert_eq!(
            table.lookup("10.0.0.3".parse().unwrap()),
            Some(&SourceId::from("b"))
        );
        // Other endpoints' peers are unknown here
        assert_eq!(table.lookup("10.0.0.4".parse().unwrap()), None);
        assert_eq!(table.lookup("10.0.0.5".parse().unwrap()), None);
    }

    #[test]
    fn ipv6_peers_route() {
        let sources = vec![source("v6", &["2001:db8::1"], 5140, Protocol::Udp)];
        let table = RouteTable::build(
            Endpoint {
                protocol: Protocol::Udp,
                port: 5140,
            },
            &sources,
        );
        assert_eq!(
            table.lookup("2001:db8::1".parse().unwrap()),
            Some(&SourceId::from("v6"))
        );
    }

    #[test]
    fn empty_set_builds_empty_table() {
        let table = RouteTable::build(
            Endpoint {
                protocol: Protocol::Tcp,
                port: 6000,
            },
            &[],
        );
        assert!(table.is_empty());
    }
}
