//! Sluice - Configuration
//!
//! Everything the daemon persists and validates:
//!
//! - [`Settings`] - daemon-level settings loaded from a TOML file
//! - [`Source`] - the per-source ingestion definition (network identity,
//!   target, queue/worker limits)
//! - [`SourceStore`] - the validated, persisted source set
//!   (`sources.json`)
//! - [`TemplateStore`], [`PolicyStore`], [`FilterStore`] - per-source
//!   learned templates, aggregation policies, and filter rules, one JSON
//!   file per source under the data directory
//!
//! # Layout on disk
//!
//! ```text
//! <data_dir>/
//!   sources.json
//!   templates/<source_id>.json
//!   aggregation/<source_id>.json
//!   filters/<source_id>.json
//! ```
//!
//! All writes go through a tmp-file + rename so a crash never leaves a
//! half-written file behind.

mod error;
mod filters;
mod policy;
mod settings;
mod source;
mod store;
mod template;
mod validation;

pub use error::{ConfigError, Result};
pub use filters::{FilterRule, FilterStore};
pub use policy::{AggregationPolicy, PolicyStore};
pub use settings::Settings;
pub use source::{Compression, Endpoint, Protocol, Source, SourceId, Target};
pub use store::{SourceStore, write_json_atomic};
pub use validation::validate_source;
pub use template::{LogTemplate, TemplateField, TemplateStore};
