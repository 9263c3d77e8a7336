//! Status translation.
//!
//! Maps the raw status and reason codes an engine reports into the tracker's
//! four-state lifecycle. Engines speak the code convention of a platform
//! download service (see [`codes`]); adapters for other engines map their
//! native statuses onto these codes.

use serde::{Deserialize, Serialize};

use super::types::{DownloadState, FailureReason};

/// Raw code values at the engine boundary.
pub mod codes {
    /// Waiting to start.
    pub const STATUS_PENDING: u32 = 1;
    /// Currently transferring.
    pub const STATUS_RUNNING: u32 = 2;
    /// Waiting to retry or for a network.
    pub const STATUS_PAUSED: u32 = 4;
    /// Finished successfully.
    pub const STATUS_SUCCESSFUL: u32 = 8;
    /// Finished with an error.
    pub const STATUS_FAILED: u32 = 16;

    pub const ERROR_UNKNOWN: u32 = 1000;
    pub const ERROR_FILE_ERROR: u32 = 1001;
    pub const ERROR_UNHANDLED_HTTP_CODE: u32 = 1002;
    pub const ERROR_HTTP_DATA_ERROR: u32 = 1004;
    pub const ERROR_TOO_MANY_REDIRECTS: u32 = 1005;
    pub const ERROR_INSUFFICIENT_SPACE: u32 = 1006;
    pub const ERROR_DEVICE_NOT_FOUND: u32 = 1007;
    pub const ERROR_CANNOT_RESUME: u32 = 1008;
    pub const ERROR_FILE_ALREADY_EXISTS: u32 = 1009;
}

/// One status row as reported by the engine for a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Raw status code.
    pub status: u32,
    /// Bytes transferred so far. Engines may report `-1` when unknown.
    pub bytes_downloaded: i64,
    /// Total size in bytes. Engines may report `-1` when unknown.
    pub bytes_total: i64,
    /// Raw reason code; only meaningful when `status` is failed.
    pub reason: u32,
}

impl EngineStatus {
    /// Build a status row.
    #[must_use]
    pub const fn new(status: u32, bytes_downloaded: i64, bytes_total: i64, reason: u32) -> Self {
        Self {
            status,
            bytes_downloaded,
            bytes_total,
            reason,
        }
    }

    /// A pending row with no bytes yet.
    #[must_use]
    pub const fn pending(bytes_total: i64) -> Self {
        Self::new(codes::STATUS_PENDING, 0, bytes_total, 0)
    }

    /// A running row.
    #[must_use]
    pub const fn running(bytes_downloaded: i64, bytes_total: i64) -> Self {
        Self::new(codes::STATUS_RUNNING, bytes_downloaded, bytes_total, 0)
    }

    /// A successful row.
    #[must_use]
    pub const fn successful(bytes_total: i64) -> Self {
        Self::new(codes::STATUS_SUCCESSFUL, bytes_total, bytes_total, 0)
    }

    /// A failed row with the given raw reason code.
    #[must_use]
    pub const fn failed(bytes_downloaded: i64, bytes_total: i64, reason: u32) -> Self {
        Self::new(codes::STATUS_FAILED, bytes_downloaded, bytes_total, reason)
    }
}

/// Result of translating one status row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Translation {
    /// Canonical lifecycle state.
    pub state: DownloadState,
    /// Progress fraction in `[0, 1]`.
    pub progress: f64,
    /// Present only when `state` is `Failed`.
    pub reason: Option<FailureReason>,
    /// Bytes transferred, negative values clamped to zero.
    pub bytes_downloaded: u64,
    /// Total bytes, negative values clamped to zero.
    pub bytes_total: u64,
}

/// Translate a raw engine row.
#[must_use]
pub fn translate(status: &EngineStatus) -> Translation {
    let state = state_for_code(status.status);
    let reason = (state == DownloadState::Failed).then(|| reason_for_code(status.reason));

    Translation {
        state,
        progress: progress_fraction(status.bytes_downloaded, status.bytes_total),
        reason,
        bytes_downloaded: clamp_bytes(status.bytes_downloaded),
        bytes_total: clamp_bytes(status.bytes_total),
    }
}

/// Map a raw status code to a lifecycle state.
///
/// Paused means the engine is waiting (for a retry or a network), which the
/// tracker reports as pending. Unknown codes are treated the same way so the
/// download keeps being polled.
#[must_use]
pub const fn state_for_code(code: u32) -> DownloadState {
    match code {
        codes::STATUS_RUNNING => DownloadState::Running,
        codes::STATUS_SUCCESSFUL => DownloadState::Successful,
        codes::STATUS_FAILED => DownloadState::Failed,
        _ => DownloadState::Pending,
    }
}

/// Map a raw reason code to a failure reason.
#[must_use]
pub const fn reason_for_code(code: u32) -> FailureReason {
    match code {
        codes::ERROR_CANNOT_RESUME => FailureReason::CannotResume,
        codes::ERROR_DEVICE_NOT_FOUND => FailureReason::DeviceNotFound,
        codes::ERROR_FILE_ALREADY_EXISTS => FailureReason::FileAlreadyExists,
        codes::ERROR_FILE_ERROR => FailureReason::FileError,
        codes::ERROR_HTTP_DATA_ERROR => FailureReason::HttpDataError,
        codes::ERROR_INSUFFICIENT_SPACE => FailureReason::InsufficientSpace,
        codes::ERROR_TOO_MANY_REDIRECTS => FailureReason::TooManyRedirects,
        codes::ERROR_UNHANDLED_HTTP_CODE => FailureReason::UnhandledHttpCode,
        _ => FailureReason::Unknown,
    }
}

/// Raw reason code for a failure reason (inverse of [`reason_for_code`]).
#[must_use]
pub const fn code_for_reason(reason: FailureReason) -> u32 {
    match reason {
        FailureReason::CannotResume => codes::ERROR_CANNOT_RESUME,
        FailureReason::DeviceNotFound => codes::ERROR_DEVICE_NOT_FOUND,
        FailureReason::FileAlreadyExists => codes::ERROR_FILE_ALREADY_EXISTS,
        FailureReason::FileError => codes::ERROR_FILE_ERROR,
        FailureReason::HttpDataError => codes::ERROR_HTTP_DATA_ERROR,
        FailureReason::InsufficientSpace => codes::ERROR_INSUFFICIENT_SPACE,
        FailureReason::TooManyRedirects => codes::ERROR_TOO_MANY_REDIRECTS,
        FailureReason::UnhandledHttpCode => codes::ERROR_UNHANDLED_HTTP_CODE,
        FailureReason::Unknown => codes::ERROR_UNKNOWN,
    }
}

/// Fraction of bytes transferred, clamped to `[0, 1]`.
///
/// Returns 0 when the total is unknown or zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_fraction(bytes_downloaded: i64, bytes_total: i64) -> f64 {
    if bytes_total <= 0 {
        return 0.0;
    }
    let downloaded = bytes_downloaded.max(0) as f64;
    (downloaded / bytes_total as f64).clamp(0.0, 1.0)
}

/// [`progress_fraction`] for already-clamped byte counts.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_fraction_u64(bytes_downloaded: u64, bytes_total: u64) -> f64 {
    if bytes_total == 0 {
        return 0.0;
    }
    (bytes_downloaded as f64 / bytes_total as f64).clamp(0.0, 1.0)
}

#[allow(clippy::cast_sign_loss)]
const fn clamp_bytes(bytes: i64) -> u64 {
    if bytes < 0 { 0 } else { bytes as u64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_table() {
        assert_eq!(state_for_code(codes::STATUS_PENDING), DownloadState::Pending);
        assert_eq!(state_for_code(codes::STATUS_RUNNING), DownloadState::Running);
        assert_eq!(state_for_code(codes::STATUS_PAUSED), DownloadState::Pending);
        assert_eq!(
            state_for_code(codes::STATUS_SUCCESSFUL),
            DownloadState::Successful
        );
        assert_eq!(state_for_code(codes::STATUS_FAILED), DownloadState::Failed);
        assert_eq!(state_for_code(42), DownloadState::Pending);
    }

    #[test]
    fn test_reason_table_is_exhaustive() {
        for reason in FailureReason::ALL {
            assert_eq!(reason_for_code(code_for_reason(reason)), reason);
        }
        assert_eq!(reason_for_code(1003), FailureReason::Unknown);
        assert_eq!(reason_for_code(0), FailureReason::Unknown);
    }

    #[test]
    fn test_progress_fraction_bounds() {
        assert!(progress_fraction(0, 0).abs() < f64::EPSILON);
        assert!(progress_fraction(500, 0).abs() < f64::EPSILON);
        assert!(progress_fraction(500, -1).abs() < f64::EPSILON);
        assert!((progress_fraction(500, 1000) - 0.5).abs() < f64::EPSILON);
        assert!((progress_fraction(1500, 1000) - 1.0).abs() < f64::EPSILON);
        assert!(progress_fraction(-20, 1000).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reason_only_attached_on_failure() {
        let running = translate(&EngineStatus::new(
            codes::STATUS_RUNNING,
            10,
            100,
            codes::ERROR_INSUFFICIENT_SPACE,
        ));
        assert_eq!(running.state, DownloadState::Running);
        assert!(running.reason.is_none());

        let failed = translate(&EngineStatus::failed(10, 100, codes::ERROR_INSUFFICIENT_SPACE));
        assert_eq!(failed.state, DownloadState::Failed);
        assert_eq!(failed.reason, Some(FailureReason::InsufficientSpace));
    }

    #[test]
    fn test_unknown_total_clamps_bytes() {
        let t = translate(&EngineStatus::running(-1, -1));
        assert_eq!(t.bytes_downloaded, 0);
        assert_eq!(t.bytes_total, 0);
        assert!(t.progress.abs() < f64::EPSILON);
    }
}
