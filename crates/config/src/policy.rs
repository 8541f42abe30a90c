//! Aggregation policies
//!
//! A policy names the template fields whose values form the aggregation
//! key. Persisted to `aggregation/<source_id>.json`.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::source::SourceId;
use crate::store::DirStore;

/// Per-source aggregation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Template field names forming the aggregation key, in order
    pub key_fields: Vec<String>,

    /// Disabled policies are kept on disk but not applied
    pub enabled: bool,
}

impl AggregationPolicy {
    /// True when this policy should be applied to batches
    pub fn is_active(&self) -> bool {
        self.enabled && !self.key_fields.is_empty()
    }
}

/// Persisted per-source aggregation policies
pub struct PolicyStore {
    inner: DirStore<AggregationPolicy>,
}

impl PolicyStore {
    /// Open `<data_dir>/aggregation`, loading existing policies.
    pub fn open(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            inner: DirStore::open(data_dir, "aggregation")?,
        })
    }

    /// The policy for a source, if any
    pub fn get(&self, id: &SourceId) -> Option<Arc<AggregationPolicy>> {
        self.inner.get(id)
    }

    /// Create or replace a source's policy
    pub fn set(&self, id: &SourceId, policy: AggregationPolicy) -> Result<Arc<AggregationPolicy>> {
        self.inner.set(id, policy)
    }

    /// Drop a source's policy
    pub fn delete(&self, id: &SourceId) -> Result<()> {
        self.inner.remove(id)
    }
}
