//! Exclusion filter rules
//!
//! A record is dropped when every enabled rule for its source matches.
//! Persisted to `filters/<source_id>.json` as a rule list.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::source::SourceId;
use crate::store::DirStore;

/// One exclusion rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Field to extract from each record
    pub field_name: String,

    /// String the extracted value must equal for the rule to match
    pub match_value: String,

    /// Disabled rules are kept on disk but not evaluated
    pub enabled: bool,
}

/// Persisted per-source filter rules
pub struct FilterStore {
    inner: DirStore<Vec<FilterRule>>,
}

impl FilterStore {
    /// Open `<data_dir>/filters`, loading existing rule sets.
    pub fn open(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            inner: DirStore::open(data_dir, "filters")?,
        })
    }

    /// The rules for a source (empty when none are configured)
    pub fn get(&self, id: &SourceId) -> Arc<Vec<FilterRule>> {
        self.inner.get(id).unwrap_or_default()
    }

    /// Replace a source's rule set
    pub fn set(&self, id: &SourceId, rules: Vec<FilterRule>) -> Result<Arc<Vec<FilterRule>>> {
        self.inner.set(id, rules)
    }

    /// Drop a source's rules
    pub fn delete(&self, id: &SourceId) -> Result<()> {
        self.inner.remove(id)
    }
}
