//! Download tracker port definition.
//!
//! This port defines the caller-facing interface of the tracker. It hides the
//! registry, cancellation tokens and poll tasks behind a small async API.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::download::{DownloadId, DownloadState, NetworkPolicy, StatusReport, TrackerResult};
use crate::utils::FileInfo;

/// Default interval between two status checks of one download.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default buffer size of the event bus.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Request to start tracking a new download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSubmission {
    /// Caller-assigned ID.
    pub id: DownloadId,
    /// Source URL.
    pub url: String,
    /// Destination, relative to the downloads directory.
    pub destination: String,
    /// Optional request headers.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Allowed networks.
    #[serde(default)]
    pub network: NetworkPolicy,
}

impl DownloadSubmission {
    /// Create a submission with required fields.
    pub fn new(
        id: impl Into<DownloadId>,
        url: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            destination: destination.into(),
            headers: IndexMap::new(),
            network: NetworkPolicy::default(),
        }
    }

    /// Add a request header; a repeated key replaces the earlier value.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the network policy.
    #[must_use]
    pub const fn with_network(mut self, network: NetworkPolicy) -> Self {
        self.network = network;
        self
    }
}

/// Synchronous acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAck {
    /// The tracked ID.
    pub id: DownloadId,
    /// Always `Pending` at submission time.
    pub status: DownloadState,
}

/// Outcome of `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOutcome {
    /// Whether the engine removed at least one entry.
    pub removed: bool,
}

/// Configuration for creating a tracker.
#[derive(Debug, Clone)]
pub struct DownloadTrackerConfig {
    /// Directory that submission destinations are resolved against.
    pub downloads_directory: PathBuf,
    /// Interval between status checks.
    pub poll_interval: Duration,
    /// Event bus buffer size per subscriber.
    pub event_capacity: usize,
}

impl Default for DownloadTrackerConfig {
    fn default() -> Self {
        Self {
            downloads_directory: PathBuf::from("."),
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl DownloadTrackerConfig {
    /// Create a new config with the downloads directory.
    #[must_use]
    pub fn new(downloads_directory: PathBuf) -> Self {
        Self {
            downloads_directory,
            ..Default::default()
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the event bus capacity.
    #[must_use]
    pub const fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

/// Caller-facing tracker operations.
#[async_trait]
pub trait DownloadTrackerPort: Send + Sync {
    /// Enqueue a download and start tracking it.
    async fn download(&self, submission: DownloadSubmission) -> TrackerResult<SubmissionAck>;

    /// Stop tracking and ask the engine to remove the transfer.
    async fn stop(&self, id: &DownloadId) -> TrackerResult<StopOutcome>;

    /// Forget a completed or failed download without touching the engine.
    ///
    /// The transfer and its file are left in place. Fails with `NotFound`
    /// for an untracked id and `InvalidArgument` while it is still active.
    async fn discard(&self, id: &DownloadId) -> TrackerResult<()>;

    /// Query the engine once for a tracked download.
    async fn check_status(&self, id: &DownloadId) -> TrackerResult<StatusReport>;

    /// Always fails with `Unsupported`.
    async fn pause(&self, id: &DownloadId) -> TrackerResult<()>;

    /// Always fails with `Unsupported`.
    async fn resume(&self, id: &DownloadId) -> TrackerResult<()>;

    /// Size and MIME type of a local file.
    async fn get_file_info(&self, path: &str) -> TrackerResult<FileInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = DownloadTrackerConfig::new(PathBuf::from("/data"))
            .with_poll_interval(Duration::from_millis(250))
            .with_event_capacity(8);
        assert_eq!(config.downloads_directory, PathBuf::from("/data"));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.event_capacity, 8);
        assert_eq!(
            DownloadTrackerConfig::default().poll_interval,
            DEFAULT_POLL_INTERVAL
        );
    }

    #[test]
    fn test_submission_headers_keep_one_value_per_key() {
        let sub = DownloadSubmission::new("a", "https://example.com/a", "a.bin")
            .with_header("Authorization", "Bearer 1")
            .with_header("Accept", "*/*")
            .with_header("Authorization", "Bearer 2");
        assert_eq!(sub.headers.len(), 2);
        assert_eq!(sub.headers["Authorization"], "Bearer 2");
        assert_eq!(sub.headers.keys().next().map(String::as_str), Some("Authorization"));
    }

    #[test]
    fn test_submission_deserializes_with_defaults() {
        let sub: DownloadSubmission = serde_json::from_str(
            r#"{"id":"a","url":"https://example.com/a","destination":"a.bin"}"#,
        )
        .unwrap();
        assert_eq!(sub.network, NetworkPolicy::AnyNetwork);
        assert!(sub.headers.is_empty());

        let sub: DownloadSubmission = serde_json::from_str(
            r#"{"id":"a","url":"u","destination":"d","network":"wifi-only"}"#,
        )
        .unwrap();
        assert_eq!(sub.network, NetworkPolicy::WifiOnly);
    }
}
