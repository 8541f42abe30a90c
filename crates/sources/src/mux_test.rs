use super::*;
use crate::test_support::{Collector, loopback_source};

/// Reserve a free loopback port by binding and dropping a socket.
fn free_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

fn loopback_mux(ingest: Arc<Collector>) -> ListenerMux {
    ListenerMux::new(ingest, TcpTuning::default()).with_bind_ip("127.0.0.1".parse().unwrap())
}

#[tokio::test]
async fn opens_one_endpoint_per_protocol_port_pair() {
    let collector = Arc::new(Collector::new());
    let mut mux = loopback_mux(Arc::clone(&collector));

    let udp_port = free_udp_port();
    let sources = vec![
        loopback_source("a", udp_port, Protocol::Udp),
        loopback_source("b", 0, Protocol::Tcp),
    ];

    let failures = mux.apply(&sources).await;
    assert!(failures.is_empty(), "unexpected failures: {failures:?}");
    assert_eq!(mux.endpoint_count(), 2);

    mux.shutdown().await;
    assert_eq!(mux.endpoint_count(), 0);
}

#[tokio::test]
async fn records_flow_through_the_mux() {
    let collector = Arc::new(Collector::new());
    let mut mux = loopback_mux(Arc::clone(&collector));

    let port = free_udp_port();
    let sources = vec![loopback_source("s1", port, Protocol::Udp)];
    assert!(mux.apply(&sources).await.is_empty());

    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(b"through the mux", ("127.0.0.1", port))
        .await
        .unwrap();

    collector.wait_for(1).await;
    let records = collector.records();
    assert_eq!(records[0].0.as_str(), "s1");
    assert_eq!(records[0].1, "through the mux");

    mux.shutdown().await;
}

#[tokio::test]
async fn unchanged_apply_keeps_endpoints_running() {
    let collector = Arc::new(Collector::new());
    let mut mux = loopback_mux(Arc::clone(&collector));

    let port = free_udp_port();
    let sources = vec![loopback_source("s1", port, Protocol::Udp)];
    assert!(mux.apply(&sources).await.is_empty());
    assert_eq!(mux.endpoint_count(), 1);

    // Same snapshot again: nothing closes, nothing rebinds
    assert!(mux.apply(&sources).await.is_empty());
    assert_eq!(mux.endpoint_count(), 1);

    // The surviving socket still receives
    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(b"still alive", ("127.0.0.1", port))
        .await
        .unwrap();
    collector.wait_for(1).await;

    mux.shutdown().await;
}

#[tokio::test]
async fn reload_reroutes_peers_without_rebinding() {
    let collector = Arc::new(Collector::new());
    let mut mux = loopback_mux(Arc::clone(&collector));

    let port = free_udp_port();
    assert!(
        mux.apply(&[loopback_source("before", port, Protocol::Udp)])
            .await
            .is_empty()
    );

    // Same endpoint, different owning source
    assert!(
        mux.apply(&[loopback_source("after", port, Protocol::Udp)])
            .await
            .is_empty()
    );
    assert_eq!(mux.endpoint_count(), 1);

    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(b"rerouted", ("127.0.0.1", port))
        .await
        .unwrap();

    collector.wait_for(1).await;
    assert_eq!(collector.records()[0].0.as_str(), "after");

    mux.shutdown().await;
}

#[tokio::test]
async fn removed_endpoints_are_closed() {
    let collector = Arc::new(Collector::new());
    let mut mux = loopback_mux(Arc::clone(&collector));

    let udp_port = free_udp_port();
    let sources = vec![
        loopback_source("a", udp_port, Protocol::Udp),
        loopback_source("b", 0, Protocol::Tcp),
    ];
    assert!(mux.apply(&sources).await.is_empty());
    assert_eq!(mux.endpoint_count(), 2);

    // Drop the TCP source; its endpoint closes, UDP survives
    assert!(
        mux.apply(&[loopback_source("a", udp_port, Protocol::Udp)])
            .await
            .is_empty()
    );
    assert_eq!(mux.endpoint_count(), 1);

    mux.shutdown().await;
}

#[tokio::test]
async fn bind_failure_is_isolated_to_its_endpoint() {
    let collector = Arc::new(Collector::new());
    let mut mux = loopback_mux(Arc::clone(&collector));

    // Occupy a TCP port so the mux cannot bind it
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken_port = blocker.local_addr().unwrap().port();

    let udp_port = free_udp_port();
    let sources = vec![
        loopback_source("good", udp_port, Protocol::Udp),
        loopback_source("bad", taken_port, Protocol::Tcp),
    ];

    let failures = mux.apply(&sources).await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0.port, taken_port);
    assert!(matches!(failures[0].1, ListenError::Bind { .. }));

    // The good endpoint runs regardless
    assert_eq!(mux.endpoint_count(), 1);
    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(b"unaffected", ("127.0.0.1", udp_port))
        .await
        .unwrap();
    collector.wait_for(1).await;

    mux.shutdown().await;
}
