//! Sluice - Sink Adapters
//!
//! Batched delivery of canonical logs to one of two targets:
//!
//! - [`FolderSink`] - newline-delimited JSON files in a directory, one
//!   file per batch, optional gzip, atomic tmp + fsync + rename
//! - [`HecSink`] - HTTP Event Collector POST with token auth and
//!   keep-alive connection pooling
//!
//! Both are wrapped by [`SinkAdapter`], the enum workers hold; delivery
//! with exponential backoff and the bounded park buffer for exhausted
//! batches live in [`retry`].
//!
//! # Failure semantics
//!
//! `deliver` returns the delivered byte count on success. Errors carry a
//! retryable/permanent classification ([`SinkError::is_retryable`]):
//! HTTP 408/429/5xx, network errors, and most disk errors are retryable;
//! other 4xx and permission failures are permanent.

mod error;
mod folder;
mod hec;
pub mod retry;

pub use error::SinkError;
pub use folder::FolderSink;
pub use hec::HecSink;

use sluice_config::Target;
use sluice_event::CanonicalLog;

/// A source's delivery target, constructed from its [`Target`] config.
pub enum SinkAdapter {
    Folder(FolderSink),
    Hec(HecSink),
}

impl SinkAdapter {
    /// Build the adapter for a source's configured target.
    pub fn from_target(source_name: &str, target: &Target) -> Result<Self, SinkError> {
        match target {
            Target::Folder {
                path, compression, ..
            } => Ok(Self::Folder(FolderSink::new(
                path.clone(),
                *compression,
                source_name,
            ))),
            Target::Hec {
                url,
                token,
                verify_tls,
                ..
            } => Ok(Self::Hec(HecSink::new(url, token, *verify_tls)?)),
        }
    }

    /// Adapter kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Folder(_) => "folder",
            Self::Hec(_) => "hec",
        }
    }

    /// Deliver one batch; returns bytes written/sent.
    pub async fn deliver(&self, batch: &[CanonicalLog]) -> Result<u64, SinkError> {
        match self {
            Self::Folder(sink) => sink.deliver(batch).await,
            Self::Hec(sink) => sink.deliver(batch).await,
        }
    }
}
