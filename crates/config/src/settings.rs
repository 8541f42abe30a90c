//! Daemon settings
//!
//! Loaded from a TOML file; every field has a default so a missing file
//! yields a fully usable configuration.
//!
//! # Example
//!
//! ```toml
//! data_dir = "/var/lib/sluice"
//! drain_timeout = "10s"
//! max_batch_latency = "1s"
//! tcp_idle_timeout = "60s"
//!
//! [log]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Daemon-level settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding all persisted state
    pub data_dir: PathBuf,

    /// How long workers may keep finishing batches after `stop()`
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,

    /// Maximum time a worker holds a partial batch open
    #[serde(with = "humantime_serde")]
    pub max_batch_latency: Duration,

    /// Idle window after which TCP connections are closed
    #[serde(with = "humantime_serde")]
    pub tcp_idle_timeout: Duration,

    /// Logging settings
    pub log: LogSettings,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            drain_timeout: Duration::from_secs(10),
            max_batch_latency: Duration::from_secs(1),
            tcp_idle_timeout: Duration::from_secs(60),
            log: LogSettings::default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file. A missing file is not an error:
    /// defaults apply.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "settings file absent, using defaults");
            return Ok(Self::default());
        }

        let body = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        body.parse()
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
