//! Shared registry of per-source metrics

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::source_metrics::{SourceMetrics, SourceSnapshot};

/// Registry of per-source metrics handles.
///
/// Listeners, queues, workers, and the control plane all share the same
/// `Arc<SourceMetrics>` per source, so every component increments the
/// same counters. Entries survive pool restarts; they are removed only
/// when the source itself is deleted.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    sources: DashMap<String, Arc<SourceMetrics>>,
}

impl MetricsRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the metrics handle for a source, creating it on first use.
    pub fn handle(&self, source_id: &str) -> Arc<SourceMetrics> {
        self.sources
            .entry(source_id.to_owned())
            .or_insert_with(|| Arc::new(SourceMetrics::new()))
            .clone()
    }

    /// Drop a deleted source's metrics
    pub fn remove(&self, source_id: &str) {
        self.sources.remove(source_id);
    }

    /// Snapshot every source, keyed by source id
    pub fn collect(&self) -> BTreeMap<String, SourceSnapshot> {
        self.sources
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_shared() {
        let registry = MetricsRegistry::new();
        let a = registry.handle("s1");
        let b = registry.handle("s1");
        a.event_in();
        assert_eq!(b.snapshot().events_in, 1);
    }

    #[test]
    fn collect_keys_by_source_id() {
        let registry = MetricsRegistry::new();
        registry.handle("s1").event_in();
        registry.handle("s2").delivered(5, 100);

        let all = registry.collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all["s1"].events_in, 1);
        assert_eq!(all["s2"].events_delivered, 5);
    }

    #[test]
    fn remove_drops_entry() {
        let registry = MetricsRegistry::new();
        registry.handle("s1");
        registry.remove("s1");
        assert!(registry.collect().is_empty());
    }
}
