//! Source validation
//!
//! Enforced at the API boundary before any state change:
//! - name and peer set non-empty, port non-zero
//! - batch size at least 1, gzip level 1-9, HEC url well-formed
//! - `(port, protocol, source_ip)` unique across all sources

use crate::error::{ConfigError, Result};
use crate::source::{Compression, Source, Target};

/// Validate a source against the rest of the set.
///
/// `existing` is every other source (the candidate itself excluded when
/// editing). Returns the first violation found; the store applies no
/// change on error.
pub fn validate_source<'a>(
    candidate: &Source,
    existing: impl IntoIterator<Item = &'a Source>,
) -> Result<()> {
    if candidate.name.trim().is_empty() {
        return Err(ConfigError::invalid_source(
            candidate.id.as_str(),
            "name",
            "must not be empty",
        ));
    }

    if candidate.port == 0 {
        return Err(ConfigError::invalid_source(
            &candidate.name,
            "port",
            "must be in 1-65535",
        ));
    }

    if candidate.source_ips.is_empty() {
        return Err(ConfigError::invalid_source(
            &candidate.name,
            "source_ips",
            "at least one peer address is required",
        ));
    }

    if candidate.queue_limit == 0 {
        return Err(ConfigError::invalid_source(
            &candidate.name,
            "queue_limit",
            "must be at least 1",
        ));
    }

    if candidate.max_workers == 0 {
        return Err(ConfigError::invalid_source(
            &candidate.name,
            "max_workers",
            "must be at least 1",
        ));
    }

    validate_target(candidate)?;

    // (port, protocol, source_ip) must be unique across the set
    let endpoint = candidate.endpoint();
    for other in existing {
        if other.id == candidate.id || other.endpoint() != endpoint {
            continue;
        }
        if let Some(ip) = candidate.source_ips.intersection(&other.source_ips).next() {
            return Err(ConfigError::PeerConflict {
                name: candidate.name.clone(),
                existing: other.name.clone(),
                ip: ip.to_string(),
                endpoint: endpoint.to_string(),
            });
        }
    }

    Ok(())
}

fn validate_target(source: &Source) -> Result<()> {
    if source.target.batch_size() == 0 {
        return Err(ConfigError::invalid_source(
            &source.name,
            "batch_size",
            "must be at least 1",
        ));
    }

    match &source.target {
        Target::Folder {
            path, compression, ..
        } => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid_source(
                    &source.name,
                    "path",
                    "must not be empty",
                ));
            }
            if let Compression::Gzip { level } = compression
                && !(1..=9).contains(level)
            {
                return Err(ConfigError::invalid_source(
                    &source.name,
                    "compression",
                    format!("gzip level {level} is outside 1-9"),
                ));
            }
        }
        Target::Hec { url, token, .. } => {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::invalid_source(
                    &source.name,
                    "url",
                    "must start with http:// or https://",
                ));
            }
            if token.is_empty() {
                return Err(ConfigError::invalid_source(
                    &source.name,
                    "token",
                    "must not be empty",
                ));
            }
        }
    }

    Ok(())
}
