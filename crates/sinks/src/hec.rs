//! HEC sink - HTTP Event Collector delivery
//!
//! Batches POST as newline-joined canonical JSON with
//! `Authorization: Splunk <token>`. The client keeps connections alive
//! and pools at most [`MAX_POOL_CONNECTIONS`] per endpoint.

use std::time::Duration;

use sluice_event::CanonicalLog;

use crate::error::SinkError;

/// Connect timeout for the HEC endpoint
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Full-request timeout (covers reading the response)
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pooled connections per HEC endpoint
const MAX_POOL_CONNECTIONS: usize = 4;

/// Delivers batches to an HTTP Event Collector endpoint
pub struct HecSink {
    client: reqwest::Client,
    url: String,
    auth_header: String,
}

impl HecSink {
    /// Build a sink for one HEC endpoint.
    ///
    /// `verify_tls = false` disables certificate verification for
    /// endpoints with self-signed certificates.
    pub fn new(url: &str, token: &str, verify_tls: bool) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .pool_max_idle_per_host(MAX_POOL_CONNECTIONS)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| SinkError::InvalidTarget {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_owned(),
            auth_header: format!("Splunk {token}"),
        })
    }

    /// POST one batch; returns the body size on 2xx.
    pub async fn deliver(&self, batch: &[CanonicalLog]) -> Result<u64, SinkError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let body = batch
            .iter()
            .map(CanonicalLog::to_json_line)
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = body.len() as u64;

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(
                url = %self.url,
                records = batch.len(),
                bytes,
                "batch delivered to HEC"
            );
            return Ok(bytes);
        }

        Err(SinkError::HttpStatus {
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
#[path = "hec_test.rs"]
mod hec_test;
