//! Download events - discriminated union for everything pushed to subscribers.

use serde::{Deserialize, Serialize};

use super::types::{DownloadId, FailureReason};

/// Single discriminated union for all download events.
///
/// Serialized with a `type` tag:
///
/// ```json
/// { "type": "download_progress", "id": "a", "progress": 0.5 }
/// { "type": "download_completed", "id": "a" }
/// { "type": "download_failed", "id": "b", "error": "ERROR_INSUFFICIENT_SPACE", "reason": "insufficient-space" }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// Progress update, emitted on every tick of a non-terminal download.
    DownloadProgress {
        /// Caller-assigned ID.
        id: DownloadId,
        /// Fraction in `[0, 1]`.
        progress: f64,
    },

    /// Download finished successfully. Emitted once.
    DownloadCompleted {
        /// Caller-assigned ID.
        id: DownloadId,
    },

    /// Download failed. Emitted once.
    DownloadFailed {
        /// Caller-assigned ID.
        id: DownloadId,
        /// Reason text, e.g. `ERROR_INSUFFICIENT_SPACE`.
        error: String,
        /// Structured failure reason.
        reason: FailureReason,
    },
}

impl DownloadEvent {
    /// Create a progress event.
    pub fn progress(id: impl Into<DownloadId>, progress: f64) -> Self {
        Self::DownloadProgress {
            id: id.into(),
            progress,
        }
    }

    /// Create a completed event.
    pub fn completed(id: impl Into<DownloadId>) -> Self {
        Self::DownloadCompleted { id: id.into() }
    }

    /// Create a failed event; the error text comes from the reason.
    pub fn failed(id: impl Into<DownloadId>, reason: FailureReason) -> Self {
        Self::DownloadFailed {
            id: id.into(),
            error: reason.text().to_string(),
            reason,
        }
    }

    /// The download this event belongs to.
    #[must_use]
    pub const fn id(&self) -> &DownloadId {
        match self {
            Self::DownloadProgress { id, .. }
            | Self::DownloadCompleted { id }
            | Self::DownloadFailed { id, .. } => id,
        }
    }

    /// Whether this is the last event for its download.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DownloadCompleted { .. } | Self::DownloadFailed { .. }
        )
    }

    /// Get the event name for wire protocols.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::DownloadProgress { .. } => "downloadProgress",
            Self::DownloadCompleted { .. } => "downloadCompleted",
            Self::DownloadFailed { .. } => "downloadFailed",
        }
    }
}
