//! Learned log templates
//!
//! A template is the field schema of a source, learned once from the
//! first successfully-parsed record after template creation and
//! persisted to `templates/<source_id>.json`. Aggregation policies
//! reference template field names.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sluice_event::{FieldKind, extract_fields, infer_kind};

use crate::error::Result;
use crate::source::SourceId;
use crate::store::DirStore;

/// One field of a learned template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
}

/// Field schema learned from a sample record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTemplate {
    /// Fields in extraction order
    pub fields: Vec<TemplateField>,

    /// When the template was learned
    pub created_at: DateTime<Utc>,
}

impl LogTemplate {
    /// Learn a template from a raw record. Returns `None` when the
    /// extractor finds no fields (the next record gets a chance).
    pub fn learn(raw: &str) -> Option<Self> {
        let extracted = extract_fields(raw);
        if extracted.is_empty() {
            return None;
        }

        let fields = extracted
            .iter()
            .map(|(name, value)| TemplateField {
                name: name.to_owned(),
                kind: infer_kind(value),
            })
            .collect();

        Some(Self {
            fields,
            created_at: Utc::now(),
        })
    }

    /// True if the template contains a field of this name
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Persisted per-source templates (`templates/<source_id>.json`)
pub struct TemplateStore {
    inner: DirStore<LogTemplate>,
}

impl TemplateStore {
    /// Open `<data_dir>/templates`, loading existing templates.
    pub fn open(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            inner: DirStore::open(data_dir, "templates")?,
        })
    }

    /// The learned template for a source, if any
    pub fn get(&self, id: &SourceId) -> Option<Arc<LogTemplate>> {
        self.inner.get(id)
    }

    /// Persist a newly learned template
    pub fn set(&self, id: &SourceId, template: LogTemplate) -> Result<Arc<LogTemplate>> {
        tracing::info!(source_id = %id, fields = template.fields.len(), "template learned");
        self.inner.set(id, template)
    }

    /// Drop a source's template
    pub fn delete(&self, id: &SourceId) -> Result<()> {
        self.inner.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn learns_fields_with_types() {
        let template = LogTemplate::learn("user=alice count=3 ratio=0.5 ok=true").unwrap();
        let kinds: Vec<(&str, FieldKind)> = template
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("user", FieldKind::String),
                ("count", FieldKind::Int),
                ("ratio", FieldKind::Float),
                ("ok", FieldKind::Bool),
            ]
        );
    }

    #[test]
    fn learn_returns_none_for_empty_payload() {
        assert!(LogTemplate::learn("").is_none());
        assert!(LogTemplate::learn("   ").is_none());
    }

    #[test]
    fn store_round_trips_across_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let id = SourceId::generate();

        {
            let store = TemplateStore::open(dir.path()).expect("open");
            let template = LogTemplate::learn("a=1 b=x").unwrap();
            store.set(&id, template).expect("set");
        }

        let store = TemplateStore::open(dir.path()).expect("reopen");
        let template = store.get(&id).expect("persisted");
        assert!(template.has_field("a"));
        assert!(template.has_field("b"));
        assert!(!template.has_field("c"));
    }

    #[test]
    fn delete_removes_template() {
        let dir = TempDir::new().expect("tempdir");
        let id = SourceId::generate();

        let store = TemplateStore::open(dir.path()).expect("open");
        store
            .set(&id, LogTemplate::learn("a=1").unwrap())
            .expect("set");
        store.delete(&id).expect("delete");
        assert!(store.get(&id).is_none());
    }
}
