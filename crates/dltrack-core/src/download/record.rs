//! Per-download record and the status report DTO.

use serde::{Deserialize, Serialize};

use super::status::{Translation, progress_fraction_u64};
use super::types::{DownloadId, DownloadState, EngineHandle, FailureReason};

/// What changed when a translation was applied to a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// State did not change (bytes may have).
    Unchanged,
    /// Pending → Running.
    Started,
    /// Reached `Successful`.
    Completed,
    /// Reached `Failed`.
    Failed(FailureReason),
}

impl Transition {
    /// Whether the record became terminal with this transition.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// Last-known state of one tracked download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Caller-assigned ID.
    pub id: DownloadId,
    /// Engine handle owned by this record.
    pub handle: EngineHandle,
    /// Last committed state.
    pub state: DownloadState,
    /// Last-known bytes transferred.
    pub bytes_downloaded: u64,
    /// Last-known total bytes (0 when unknown).
    pub bytes_total: u64,
    /// Set once the record is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl DownloadRecord {
    /// Fresh record for a just-enqueued download.
    #[must_use]
    pub const fn new(id: DownloadId, handle: EngineHandle) -> Self {
        Self {
            id,
            handle,
            state: DownloadState::Pending,
            bytes_downloaded: 0,
            bytes_total: 0,
            reason: None,
        }
    }

    /// Progress fraction from the last-known byte counts.
    #[must_use]
    pub fn progress(&self) -> f64 {
        progress_fraction_u64(self.bytes_downloaded, self.bytes_total)
    }

    /// Commit one translated status row.
    ///
    /// Terminal records are frozen: the call is a no-op. Otherwise the byte
    /// counts are replaced and the state only moves forward along
    /// `Pending → Running → {Successful | Failed}`.
    pub fn apply(&mut self, translation: &Translation) -> Transition {
        if self.state.is_terminal() {
            return Transition::Unchanged;
        }

        self.bytes_downloaded = translation.bytes_downloaded;
        self.bytes_total = translation.bytes_total;

        let previous = self.state;
        if translation.state.rank() > previous.rank() {
            self.state = translation.state;
        }

        match self.state {
            DownloadState::Successful => Transition::Completed,
            DownloadState::Failed => {
                let reason = translation.reason.unwrap_or(FailureReason::Unknown);
                self.reason = Some(reason);
                Transition::Failed(reason)
            }
            DownloadState::Running if previous == DownloadState::Pending => Transition::Started,
            DownloadState::Running | DownloadState::Pending => Transition::Unchanged,
        }
    }
}

/// Result of a one-off status check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Canonical state from this query.
    pub status: DownloadState,
    /// Bytes transferred so far.
    pub bytes_downloaded: u64,
    /// Total bytes (0 when unknown).
    pub bytes_total: u64,
    /// Progress fraction in `[0, 1]`.
    pub progress: f64,
    /// Failure reason, only when `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    /// Reason text, only when `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_text: Option<String>,
}

impl From<&Translation> for StatusReport {
    fn from(t: &Translation) -> Self {
        Self {
            status: t.state,
            bytes_downloaded: t.bytes_downloaded,
            bytes_total: t.bytes_total,
            progress: t.progress,
            reason: t.reason,
            reason_text: t.reason.map(|r| r.text().to_string()),
        }
    }
}
