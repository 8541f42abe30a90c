//! Record routing from listeners into per-source queues

use dashmap::DashMap;
use std::sync::Arc;

use sluice_config::SourceId;
use sluice_event::LogRecord;
use sluice_metrics::MetricsRegistry;
use sluice_pipeline::QueueSender;
use sluice_sources::Ingest;

/// The [`Ingest`] capability handed to listeners.
///
/// Holds one queue sender per active source; the control plane registers
/// and removes entries as pools come and go. Enqueueing into a full
/// queue drops and counts inside the sender, so listeners never block.
#[derive(Default)]
pub struct IngestRouter {
    senders: DashMap<SourceId, QueueSender>,
    registry: Arc<MetricsRegistry>,
}

impl IngestRouter {
    /// Create a router sharing the plane's metrics registry
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self {
            senders: DashMap::new(),
            registry,
        }
    }

    /// Register a source's queue (on pool creation)
    pub fn register(&self, id: SourceId, sender: QueueSender) {
        self.senders.insert(id, sender);
    }

    /// Remove a source's queue (on pool teardown)
    pub fn unregister(&self, id: &SourceId) {
        self.senders.remove(id);
    }

    /// Number of registered sources
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// True when no sources are registered
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl Ingest for IngestRouter {
    fn enqueue(&self, source_id: &SourceId, record: LogRecord) {
        // A missing entry is a benign race with source deletion
        if let Some(sender) = self.senders.get(source_id) {
            sender.push(record);
        }
    }

    fn parse_failure(&self, source_id: &SourceId) {
        self.registry.handle(source_id.as_str()).dropped_parse();
    }
}
