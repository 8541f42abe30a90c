//! Sluice - Event Model
//!
//! Shared types that flow through the ingestion pipeline:
//!
//! - [`LogRecord`] - a raw record as received from the network, before
//!   any parsing
//! - [`CanonicalLog`] - the normalized `{time, event, source}` object
//!   delivered to sinks
//! - [`extract_fields`] - the field extraction strategies used by
//!   template learning, filtering, and aggregation
//! - [`FieldKind`] - inferred field types for learned templates
//!
//! # Design
//!
//! Every other crate in the workspace depends on this one; it depends on
//! nothing but serde. Extraction is a fixed priority list of parsing
//! strategies (JSON, key=value, `key: value`, positional) rather than a
//! pluggable registry - the set of formats is closed and ordering is
//! part of the observable behavior.

mod canonical;
mod extract;
mod infer;
mod record;

pub use canonical::{CanonicalLog, EventPayload};
pub use extract::{FieldMap, extract_fields, lookup_field};
pub use infer::{FieldKind, infer_kind};
pub use record::LogRecord;
