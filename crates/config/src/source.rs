//! Source model
//!
//! A [`Source`] ties a network identity (peer IPs + port + protocol) to
//! a delivery target. Sources are immutable once created; edits replace
//! the whole record atomically through the store.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default scale-up threshold (records queued)
pub const DEFAULT_QUEUE_LIMIT: usize = 10_000;

/// Default worker ceiling per source
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Default batch size for HEC targets
pub const DEFAULT_HEC_BATCH_SIZE: usize = 500;

/// Default batch size for folder targets
pub const DEFAULT_FOLDER_BATCH_SIZE: usize = 5_000;

/// Queue capacity is this multiple of `queue_limit`
pub const QUEUE_CAPACITY_FACTOR: usize = 4;

/// Opaque stable source identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// View as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Transport protocol a source listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("UDP"),
            Self::Tcp => f.write_str("TCP"),
        }
    }
}

/// A listening endpoint: one socket per distinct `(protocol, port)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub protocol: Protocol,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.port)
    }
}

/// Folder sink compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "codec", rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip {
        /// gzip level 1-9
        level: u32,
    },
}

impl Compression {
    /// File extension suffix for this codec ("" or ".gz")
    pub fn extension(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip { .. } => ".gz",
        }
    }
}

/// Delivery target for a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Target {
    /// Newline-delimited JSON files in a directory
    Folder {
        path: PathBuf,
        batch_size: usize,
        compression: Compression,
    },

    /// HTTP Event Collector endpoint
    Hec {
        url: String,
        token: String,
        batch_size: usize,
        verify_tls: bool,
    },
}

impl Target {
    /// Records per delivered batch
    pub fn batch_size(&self) -> usize {
        match self {
            Self::Folder { batch_size, .. } | Self::Hec { batch_size, .. } => *batch_size,
        }
    }
}

/// A configured log source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier
    pub id: SourceId,

    /// Display name; embedded in canonical logs and folder file names
    pub name: String,

    /// Peer addresses routed to this source (non-empty)
    pub source_ips: BTreeSet<IpAddr>,

    /// Listening port (1-65535)
    pub port: u16,

    /// Transport protocol
    pub protocol: Protocol,

    /// Delivery target
    pub target: Target,

    /// Queue depth that triggers worker scale-up; queue capacity is
    /// `QUEUE_CAPACITY_FACTOR` times this
    #[serde(default = "default_queue_limit")]
    pub queue_limit: usize,

    /// Worker ceiling for the processor pool
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_queue_limit() -> usize {
    DEFAULT_QUEUE_LIMIT
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

impl Source {
    /// The `(protocol, port)` endpoint this source listens on
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            protocol: self.protocol,
            port: self.port,
        }
    }

    /// Bounded queue capacity for this source
    pub fn queue_capacity(&self) -> usize {
        self.queue_limit.saturating_mul(QUEUE_CAPACITY_FACTOR).max(1)
    }
}
