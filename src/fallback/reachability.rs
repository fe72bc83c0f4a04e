//! Backend reachability probing for the manual retry action.
//!
//! # Design Decisions
//! - The probe is raced against an explicit timeout; it can never hang past it
//! - Any 2xx or 3xx answer counts as reachable

use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::time;

/// Why a reachability probe failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("reachability request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend answered with status {0}")]
    Status(u16),

    #[error("reachability probe timed out after {0:?}")]
    Timeout(Duration),
}

/// Checks whether the backend can be reached.
pub trait ReachabilityProbe: Send + Sync + 'static {
    fn probe(&self) -> BoxFuture<'static, Result<(), ProbeError>>;
}

/// HTTP GET against a fixed backend endpoint.
#[derive(Debug, Clone)]
pub struct HttpReachability {
    client: reqwest::Client,
    url: String,
}

impl HttpReachability {
    pub fn new(url: impl Into<String>) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .user_agent("renderer-supervisor-reachability")
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReachabilityProbe for HttpReachability {
    fn probe(&self) -> BoxFuture<'static, Result<(), ProbeError>> {
        let request = self.client.get(&self.url);
        let url = self.url.clone();
        Box::pin(async move {
            let response = request.send().await?;
            let status = response.status();
            if status.is_success() || status.is_redirection() {
                tracing::debug!(url = %url, status = %status, "Backend reachable");
                Ok(())
            } else {
                tracing::warn!(url = %url, status = %status, "Backend answered with error status");
                Err(ProbeError::Status(status.as_u16()))
            }
        })
    }
}

/// Run `probe`, failing with [`ProbeError::Timeout`] once `timeout` elapses.
pub async fn probe_with_timeout(probe: &dyn ReachabilityProbe, timeout: Duration) -> Result<(), ProbeError> {
    match time::timeout(timeout, probe.probe()).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Reachability probe timed out");
            Err(ProbeError::Timeout(timeout))
        }
    }
}
