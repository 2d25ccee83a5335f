//! HTTP client for the upstream status API.
//!
//! One lookup is a single GET of `{endpoint}/{uid}` bounded by a hard
//! per-request timeout. The client performs no retries and never touches
//! the order — outcome classification is the caller's input for counters
//! and the run-level circuit breaker.

use async_trait::async_trait;
use passtrack_core::error::{FetchError, PasstrackError};
use passtrack_core::order::UpstreamStatus;
use passtrack_core::traits::StatusSource;
use std::time::Duration;
use tracing::debug;

pub struct MidpassClient {
    http: reqwest::Client,
}

impl MidpassClient {
    pub fn new(timeout: Duration) -> Result<Self, PasstrackError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PasstrackError::Upstream(format!("http client init failed: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl StatusSource for MidpassClient {
    async fn fetch(&self, endpoint: &str, uid: &str) -> Result<UpstreamStatus, FetchError> {
        let url = format!("{endpoint}/{uid}");
        debug!("midpass: GET {url}");

        let resp = self.http.get(&url).send().await.map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Request(format!("upstream returned {status}")));
        }

        let body = resp.text().await.map_err(classify)?;
        decode_body(&body)
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Request(e.to_string())
    }
}

/// An empty or `null` body means the upstream has no record for the UID.
fn decode_body(body: &str) -> Result<UpstreamStatus, FetchError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(FetchError::NotFound);
    }
    serde_json::from_str(trimmed).map_err(|e| FetchError::Request(format!("bad payload: {e}")))
}
