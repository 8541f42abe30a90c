//! Shared helpers for listener tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use sluice_config::{Compression, Protocol, Source, SourceId, Target};
use sluice_event::LogRecord;

use crate::Ingest;

/// Test ingest capability that collects everything it receives
#[derive(Debug, Default)]
pub struct Collector {
    records: Mutex<Vec<(SourceId, String)>>,
    parse_failures: AtomicU64,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(SourceId, String)> {
        self.records.lock().unwrap().clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.records().into_iter().map(|(_, p)| p).collect()
    }

    pub fn parse_failures(&self) -> u64 {
        self.parse_failures.load(Ordering::Relaxed)
    }

    /// Poll until `n` records arrived (2s cap)
    pub async fn wait_for(&self, n: usize) {
        for _ in 0..200 {
            if self.records.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("expected {n} records, got {:?}", self.records());
    }
}

impl Ingest for Collector {
    fn enqueue(&self, source_id: &SourceId, record: LogRecord) {
        self.records
            .lock()
            .unwrap()
            .push((source_id.clone(), record.payload));
    }

    fn parse_failure(&self, _source_id: &SourceId) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// A minimal source bound to loopback on the given endpoint
pub fn loopback_source(name: &str, port: u16, protocol: Protocol) -> Source {
    Source {
        id: SourceId::from(name),
        name: name.into(),
        source_ips: ["127.0.0.1".parse().unwrap()].into(),
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
