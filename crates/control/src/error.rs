//! Control plane errors

use thiserror::Error;

/// Errors surfaced by control plane operations
#[derive(Debug, Error)]
pub enum ControlError {
    /// Configuration load, validation, or persistence failure
    #[error(transparent)]
    Config(#[from] sluice_config::ConfigError),

    /// A sink adapter could not be constructed from a target
    #[error(transparent)]
    Sink(#[from] sluice_sinks::SinkError),

    /// One or more endpoints failed to bind at startup
    #[error("failed to bind {endpoints}")]
    Bind {
        /// Endpoint list, e.g. "UDP:514, TCP:601"
        endpoints: String,
    },
}

impl ControlError {
    /// True when the failure is a listener bind failure (launchers map
    /// this to a distinct exit code).
    pub fn is_bind_failure(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}
