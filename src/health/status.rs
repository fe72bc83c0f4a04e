//! Connection status snapshots and load error classification.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Immutable snapshot of the renderer's connection quality.
///
/// A new snapshot replaces the previous one on every lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub loading_time_ms: Option<u64>,
    pub is_slow: bool,
    pub url: Option<String>,
    /// Wall-clock time of the snapshot (milliseconds since epoch).
    pub timestamp_ms: u64,
}

impl ConnectionStatus {
    /// Status before any load has been observed.
    pub fn initial() -> Self {
        Self {
            connected: true,
            loading_time_ms: None,
            is_slow: false,
            url: None,
            timestamp_ms: now_ms(),
        }
    }

    pub fn connected(url: &str, loading_time: Option<Duration>, is_slow: bool) -> Self {
        Self {
            connected: true,
            loading_time_ms: loading_time.map(|d| d.as_millis() as u64),
            is_slow,
            url: Some(url.to_string()),
            timestamp_ms: now_ms(),
        }
    }

    pub fn disconnected(url: &str) -> Self {
        Self {
            connected: false,
            loading_time_ms: None,
            is_slow: false,
            url: Some(url.to_string()),
            timestamp_ms: now_ms(),
        }
    }

    pub fn loading_time(&self) -> Option<Duration> {
        self.loading_time_ms.map(Duration::from_millis)
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::initial()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Network-layer failure kinds reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkFailure {
    Unreachable,
    TimedOut,
    HostUnreachable,
    ConnectionLost,
    DnsLookupFailed,
    Cancelled,
}

/// A navigation failure reported through `onLoadError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadError {
    /// The main document answered with an error status.
    Http { status: u16 },
    /// The request never produced a response.
    Network(NetworkFailure),
    /// Anything else the renderer reports.
    Other { code: i64, description: String },
}

impl LoadError {
    /// Whether this error means the backend itself is down.
    ///
    /// Only these errors surface the connection-error screen outside the initial load.
    pub fn is_server_down(&self) -> bool {
        match self {
            LoadError::Http { status } => matches!(status, 500 | 502 | 503 | 504),
            LoadError::Network(failure) => matches!(
                failure,
                NetworkFailure::Unreachable | NetworkFailure::TimedOut | NetworkFailure::HostUnreachable
            ),
            LoadError::Other { .. } => false,
        }
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Http { status } => write!(f, "HTTP {}", status),
            LoadError::Network(failure) => write!(f, "network failure: {:?}", failure),
            LoadError::Other { code, description } => write!(f, "error {}: {}", code, description),
        }
    }
}
