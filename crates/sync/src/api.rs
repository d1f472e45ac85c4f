//! HTTP client for the pull snapshot source.
//!
//! Wraps the live-progress endpoint using [`reqwest`]. The endpoint is a
//! `POST` because the backend settles accrual as a side effect of
//! answering it.

use std::time::Duration;

use accrual_core::SnapshotSet;
use async_trait::async_trait;

use crate::credential::Credential;
use crate::messages::{parse_payload, PayloadError};

/// Default path of the live-progress endpoint.
pub const DEFAULT_POLL_PATH: &str = "/api/mining/live-progress";

/// Source of complete snapshot sets for the pull transport.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_snapshots(&self) -> Result<SnapshotSet, PullApiError>;
}

/// HTTP client for the live-progress endpoint.
pub struct PullApi {
    client: reqwest::Client,
    endpoint: String,
    credential: Credential,
}

/// Errors from the pull API layer.
#[derive(Debug, thiserror::Error)]
pub enum PullApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("Snapshot API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body was not an acceptable payload.
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl PullApi {
    /// Create a client for `{api_url}{poll_path}`.
    ///
    /// * `timeout` bounds each request so a hung poll cannot outlive
    ///   the next cycle.
    pub fn new(
        api_url: &str,
        poll_path: &str,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, PullApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url, poll_path, credential))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_url: &str,
        poll_path: &str,
        credential: Credential,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", api_url.trim_end_matches('/'), poll_path),
            credential,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SnapshotFetcher for PullApi {
    async fn fetch_snapshots(&self) -> Result<SnapshotSet, PullApiError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.credential.token())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PullApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(parse_payload(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let api = PullApi::with_client(
            reqwest::Client::new(),
            "http://host:8000/",
            DEFAULT_POLL_PATH,
            Credential::new("t"),
        );
        assert_eq!(api.endpoint(), "http://host:8000/api/mining/live-progress");
    }
}
