use super::*;
use crate::test_support::{Collector, loopback_source};
use sluice_config::{Endpoint, Protocol};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn routed_to(name: &str) -> Arc<ArcSwap<RouteTable>> {
    let endpoint = Endpoint {
        protocol: Protocol::Tcp,
        port: 0,
    };
    let source = loopback_source(name, 0, Protocol::Tcp);
    Arc::new(ArcSwap::new(Arc::new(RouteTable::build(
        endpoint,
        &[source],
    ))))
}

async fn bind_endpoint(
    routes: Arc<ArcSwap<RouteTable>>,
    ingest: Arc<Collector>,
    idle_timeout: Duration,
) -> (SocketAddr, CancellationToken) {
    let endpoint = TcpEndpoint::bind(
        "127.0.0.1:0".parse().unwrap(),
        routes,
        ingest,
        idle_timeout,
    )
    .await
    .expect("bind loopback");
    let addr = endpoint.local_addr().expect("local addr");
    assert_eq!(endpoint.unknown_peer_count(), 0);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move { endpoint.run(token).await });
    (addr, cancel)
}

#[tokio::test]
async fn lines_become_records_in_order() {
    let collector = Arc::new(Collector::new());
    let (addr, cancel) =
        bind_endpoint(routed_to("s2"), Arc::clone(&collector), Duration::from_secs(30)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"first\nsecond\r\nthird\n").await.unwrap();

    collector.wait_for(3).await;
    assert_eq!(collector.payloads(), vec!["first", "second", "third"]);
    let records = collector.records();
    assert!(records.iter().all(|(id, _)| id.as_str() == "s2"));

    cancel.cancel();
}

#[tokio::test]
async fn unterminated_tail_is_flushed_on_close() {
    let collector = Arc::new(Collector::new());
    let (addr, cancel) =
        bind_endpoint(routed_to("s2"), Arc::clone(&collector), Duration::from_secs(30)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"complete\npartial").await.unwrap();
    drop(client);

    collector.wait_for(2).await;
    assert_eq!(collector.payloads(), vec!["complete", "partial"]);

    cancel.cancel();
}

#[tokio::test]
async fn empty_lines_are_skipped() {
    let collector = Arc::new(Collector::new());
    let (addr, cancel) =
        bind_endpoint(routed_to("s2"), Arc::clone(&collector), Duration::from_secs(30)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"a\n\n\r\nb\n").await.unwrap();

    collector.wait_for(2).await;
    assert_eq!(collector.payloads(), vec!["a", "b"]);

    cancel.cancel();
}

#[tokio::test]
async fn oversize_line_is_dropped_and_counted() {
    let collector = Arc::new(Collector::new());
    let (addr, cancel) =
        bind_endpoint(routed_to("s2"), Arc::clone(&collector), Duration::from_secs(30)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let huge = vec![b'x'; MAX_TCP_RECORD + 16];
    client.write_all(&huge).await.unwrap();
    client.write_all(b"\nsurvivor\n").await.unwrap();

    collector.wait_for(1).await;
    assert_eq!(collector.payloads(), vec!["survivor"]);
    assert_eq!(collector.parse_failures(), 1);

    cancel.cancel();
}

#[tokio::test]
async fn unknown_peer_connection_is_closed() {
    let collector = Arc::new(Collector::new());
    let routes = Arc::new(ArcSwap::new(Arc::new(RouteTable::default())));
    let (addr, cancel) =
        bind_endpoint(routes, Arc::clone(&collector), Duration::from_secs(30)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    // The server closes immediately; our write may succeed into the
    // socket buffer, but reading must hit EOF and nothing is ingested.
    let _ = client.write_all(b"denied\n").await;
    let mut buf = [0u8; 8];
    let read = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .expect("server should close the connection");
    assert_eq!(read.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(collector.records().is_empty());

    cancel.cancel();
}

#[tokio::test]
async fn idle_connections_are_closed() {
    let collector = Arc::new(Collector::new());
    let (addr, cancel) = bind_endpoint(
        routed_to("s2"),
        Arc::clone(&collector),
        Duration::from_millis(100),
    )
    .await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"before-idle\n").await.unwrap();
    collector.wait_for(1).await;

    // Stay silent past the idle window; the server closes our side
    let mut buf = [0u8; 8];
    let read = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .expect("idle close expected");
    assert_eq!(read.unwrap(), 0);

    cancel.cancel();
}

#[tokio::test]
async fn cancellation_stops_in_flight_connections() {
    let collector = Arc::new(Collector::new());
    let (addr, cancel) =
        bind_endpoint(routed_to("s2"), Arc::clone(&collector), Duration::from_secs(30)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"pre-shutdown\n").await.unwrap();
    collector.wait_for(1).await;

    cancel.cancel();

    // Connection handlers observe the child token and close
    let mut buf = [0u8; 8];
    let read = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .expect("shutdown close expected");
    assert_eq!(read.unwrap(), 0);
}
