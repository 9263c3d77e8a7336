//! Download engine port.
//!
//! The engine performs the actual transfer (an OS download service, an HTTP
//! client with range-request support, ...). The tracker only enqueues
//! requests and polls status by handle.

use std::path::PathBuf;

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

use crate::download::{EngineHandle, EngineStatus, NetworkPolicy, TrackerError};

/// Whether the engine should surface its own progress notification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NotificationVisibility {
    /// Visible while running and after completion.
    #[default]
    VisibleNotifyCompleted,
    /// Visible while running only.
    Visible,
    /// No engine notification.
    Hidden,
}

/// A fully resolved transfer request handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    /// Source URL.
    pub url: url::Url,
    /// Absolute destination path.
    pub destination: PathBuf,
    /// Request headers, one value per key.
    pub headers: IndexMap<String, String>,
    /// Allowed networks.
    pub network: NetworkPolicy,
    /// Allow transfers over metered connections.
    pub allow_metered: bool,
    /// Allow transfers while roaming.
    pub allow_roaming: bool,
    /// Engine-side notification behaviour.
    pub notification: NotificationVisibility,
}

impl EngineRequest {
    /// Create a request with the default flags (metered and roaming allowed,
    /// notify on completion, any network).
    pub fn new(url: url::Url, destination: impl Into<PathBuf>) -> Self {
        Self {
            url,
            destination: destination.into(),
            headers: IndexMap::new(),
            network: NetworkPolicy::default(),
            allow_metered: true,
            allow_roaming: true,
            notification: NotificationVisibility::default(),
        }
    }

    /// Set the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Set the network policy.
    #[must_use]
    pub const fn with_network(mut self, network: NetworkPolicy) -> Self {
        self.network = network;
        self
    }
}

/// Errors reported by engine adapters.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine refused the request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The engine could not be reached or is shutting down.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// Storage or I/O failure inside the adapter.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<EngineError> for TrackerError {
    fn from(err: EngineError) -> Self {
        Self::engine(err.to_string())
    }
}

/// Port for the external download engine.
///
/// Implementations must not block the runtime: a slow `query` for one handle
/// must not hold up queries for other handles.
#[async_trait]
pub trait DownloadEnginePort: Send + Sync {
    /// Enqueue a transfer and return its handle.
    async fn enqueue(&self, request: EngineRequest) -> Result<EngineHandle, EngineError>;

    /// Query the current status of a handle.
    ///
    /// Returns `Ok(None)` when the engine has no row for the handle.
    async fn query(&self, handle: EngineHandle) -> Result<Option<EngineStatus>, EngineError>;

    /// Cancel and remove a transfer. Returns the number of rows removed.
    async fn remove(&self, handle: EngineHandle) -> Result<u32, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let url = url::Url::parse("https://example.com/file.bin").unwrap();
        let req = EngineRequest::new(url, "/tmp/file.bin");
        assert!(req.allow_metered);
        assert!(req.allow_roaming);
        assert_eq!(req.network, NetworkPolicy::AnyNetwork);
        assert_eq!(req.notification, NotificationVisibility::VisibleNotifyCompleted);
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_engine_error_maps_to_tracker_error() {
        let err: TrackerError = EngineError::Unavailable("down".to_string()).into();
        assert_eq!(err.code(), "ENGINE_ERROR");
        assert!(err.to_string().contains("down"));
    }
}
