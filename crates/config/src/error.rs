//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors from loading, validating, or persisting configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write a state file
    #[error("failed to access '{path}': {source}")]
    Io {
        /// Path involved
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse a persisted JSON file
    #[error("failed to parse '{path}': {source}")]
    Json {
        /// Path involved
        path: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Failed to parse the settings file
    #[error("failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// Unknown source id
    #[error("no source with id '{id}'")]
    UnknownSource {
        /// The missing id
        id: String,
    },

    /// Validation error - a peer is already claimed on this endpoint
    #[error(
        "source '{name}' conflicts with '{existing}': \
         {ip} is already bound on {endpoint}"
    )]
    PeerConflict {
        /// Source being added or edited
        name: String,
        /// Source already owning the peer
        existing: String,
        /// Conflicting peer address
        ip: String,
        /// The shared endpoint
        endpoint: String,
    },

    /// Validation error - a field has an unacceptable value
    #[error("source '{name}' has invalid {field}: {message}")]
    InvalidSource {
        /// Source name
        name: String,
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Create an Io error with path context
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a Json error with path context
    pub fn json(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Create an UnknownSource error
    pub fn unknown_source(id: impl Into<String>) -> Self {
        Self::UnknownSource { id: id.into() }
    }

    /// Create an InvalidSource error
    pub fn invalid_source(
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidSource {
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}
