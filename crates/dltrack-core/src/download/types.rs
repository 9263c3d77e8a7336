//! Core domain types for tracked downloads.
//!
//! Pure data types with no I/O dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller-assigned identifier for a download.
///
/// The tracker never invents IDs; it only checks that an ID is non-empty and
/// unique among the downloads it currently tracks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(String);

impl DownloadId {
    /// Create a new download ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the ID is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DownloadId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DownloadId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque identifier assigned by the download engine on enqueue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineHandle(u64);

impl EngineHandle {
    /// Wrap a raw engine handle.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value the engine understands.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which networks the engine may use for a transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkPolicy {
    /// Any available network (mobile or wifi).
    #[default]
    AnyNetwork,
    /// Wifi only.
    WifiOnly,
}

impl NetworkPolicy {
    /// Parse the caller-facing network option.
    ///
    /// Only `"wifi-only"` restricts the transfer; anything else, including a
    /// missing value, means any network.
    #[must_use]
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            Some("wifi-only") => Self::WifiOnly,
            _ => Self::AnyNetwork,
        }
    }

    /// Wire name of the policy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AnyNetwork => "any-network",
            Self::WifiOnly => "wifi-only",
        }
    }
}

/// Lifecycle state of a tracked download.
///
/// Transitions only move forward: `Pending → Running → {Successful | Failed}`.
/// There is no paused state; the engine model cannot pause single transfers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Enqueued, no bytes moving yet.
    #[default]
    Pending,
    /// Transfer in progress.
    Running,
    /// Finished successfully.
    Successful,
    /// Finished with a failure reason.
    Failed,
}

impl DownloadState {
    /// Whether no further transitions can happen.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Successful | Self::Failed)
    }

    /// Position along the lifecycle, used to keep transitions monotonic.
    pub(crate) const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Successful | Self::Failed => 2,
        }
    }

    /// String representation for logs and wire formats.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Successful => "successful",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-reported cause of a failed download.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// A partial download could not be resumed.
    CannotResume,
    /// No external storage device was found.
    DeviceNotFound,
    /// The destination file already exists.
    #[serde(rename = "file-exists", alias = "file-already-exists")]
    FileAlreadyExists,
    /// A storage error not covered by another reason.
    FileError,
    /// Error receiving or processing data at the HTTP level.
    HttpDataError,
    /// Not enough storage space.
    InsufficientSpace,
    /// Too many redirects.
    TooManyRedirects,
    /// An HTTP code the engine does not handle.
    UnhandledHttpCode,
    /// Anything else, including codes this crate does not recognise.
    Unknown,
}

impl FailureReason {
    /// Every reason, in table order.
    pub const ALL: [Self; 9] = [
        Self::CannotResume,
        Self::DeviceNotFound,
        Self::FileAlreadyExists,
        Self::FileError,
        Self::HttpDataError,
        Self::InsufficientSpace,
        Self::TooManyRedirects,
        Self::UnhandledHttpCode,
        Self::Unknown,
    ];

    /// Stable kebab-case code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CannotResume => "cannot-resume",
            Self::DeviceNotFound => "device-not-found",
            Self::FileAlreadyExists => "file-exists",
            Self::FileError => "file-error",
            Self::HttpDataError => "http-data-error",
            Self::InsufficientSpace => "insufficient-space",
            Self::TooManyRedirects => "too-many-redirects",
            Self::UnhandledHttpCode => "unhandled-http-code",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable reason text reported to callers.
    #[must_use]
    pub const fn text(&self) -> &'static str {
        match self {
            Self::CannotResume => "ERROR_CANNOT_RESUME",
            Self::DeviceNotFound => "ERROR_DEVICE_NOT_FOUND",
            Self::FileAlreadyExists => "ERROR_FILE_ALREADY_EXISTS",
            Self::FileError => "ERROR_FILE_ERROR",
            Self::HttpDataError => "ERROR_HTTP_DATA_ERROR",
            Self::InsufficientSpace => "ERROR_INSUFFICIENT_SPACE",
            Self::TooManyRedirects => "ERROR_TOO_MANY_REDIRECTS",
            Self::UnhandledHttpCode => "ERROR_UNHANDLED_HTTP_CODE",
            Self::Unknown => "ERROR_UNKNOWN",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl FromStr for FailureReason {
    type Err = std::convert::Infallible;

    /// Parse a kebab-case code. `file-already-exists` is accepted as an alias.
    /// Unrecognised codes become `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reason = match s {
            "file-already-exists" => Self::FileAlreadyExists,
            other => Self::ALL
                .into_iter()
                .find(|r| r.code() == other)
                .unwrap_or(Self::Unknown),
        };
        Ok(reason)
    }
}
