//! Liveness probe.
//!
//! # Responsibilities
//! - Issue one GET against `server + path` bounded by a timeout
//! - Reduce the outcome to healthy (status exactly 200) or a failure reason
//!
//! # Design Decisions
//! - No retries; the monitor re-probes on its next pass
//! - The response body is drained within the timeout and always dropped
//! - Idle connections are not pooled, so each probe exercises connect
//! - http and https servers share one rustls-backed client

use std::time::Duration;
use reqwest::{Client, StatusCode};
use tokio::time;
use url::Url;

/// Upper bound on the response body read before it is dropped.
const DRAIN_LIMIT: usize = 64 * 1024;

/// Why a probe reported unhealthy.
#[derive(Debug, thiserror::Error)]
pub enum ProbeFailure {
    #[error("invalid probe URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub type ProbeResult = Result<(), ProbeFailure>;

/// HTTP(S) liveness prober. Cheap to clone.
#[derive(Clone, Debug)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// Build the prober. Fails only if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("backend-health-check")
            .pool_max_idle_per_host(0)
            .tcp_nodelay(true)
            .no_proxy()
            .build()?;

        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client (custom roots, client certificates).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Probe `server` at `path`.
    pub async fn probe(&self, server: &Url, path: &str, timeout: Duration) -> ProbeResult {
        let uri = probe_uri(server, path);
        let target = Url::parse(&uri)
            .map_err(|e| ProbeFailure::InvalidUri { uri: uri.clone(), reason: e.to_string() })?;

        let exchange = async {
            let mut response = self.client.get(target).send().await?;
            let status = response.status();
            // Release the connection whatever the status.
            let mut drained = 0;
            while drained < DRAIN_LIMIT {
                match response.chunk().await {
                    Ok(Some(chunk)) => drained += chunk.len(),
                    Ok(None) | Err(_) => break,
                }
            }
            Ok::<_, ProbeFailure>(status)
        };

        match time::timeout(timeout, exchange).await {
            Ok(Ok(StatusCode::OK)) => Ok(()),
            Ok(Ok(status)) => Err(ProbeFailure::Status(status)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProbeFailure::Timeout(timeout)),
        }
    }

    /// Healthy iff the probe succeeds.
    pub async fn is_healthy(&self, server: &Url, path: &str, timeout: Duration) -> bool {
        self.probe(server, path, timeout).await.is_ok()
    }
}

/// Join a server base URL and a probe path without doubling the `/`.
pub fn probe_uri(server: &Url, path: &str) -> String {
    let base = server.as_str();
    if path.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), path)
    } else {
        format!("{}{}", base, path)
    }
}
