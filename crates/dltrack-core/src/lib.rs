//! Core domain types and port definitions for dltrack.
//!
//! This crate holds everything the tracker shares with its callers and its
//! engine adapters: ids, states, status translation, events, the error
//! taxonomy, settings and the port traits. It performs no I/O beyond the
//! file-info helper.

#![deny(unused_crate_dependencies)]

pub mod download;
pub mod ports;
pub mod settings;
pub mod utils;

pub use download::{
    DownloadEvent, DownloadId, DownloadRecord, DownloadState, EngineHandle, EngineStatus,
    FailureReason, NetworkPolicy, StatusReport, TrackerError, TrackerResult, Transition,
    Translation, progress_fraction, translate,
};
pub use ports::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_POLL_INTERVAL, DownloadEnginePort, DownloadEventEmitterPort,
    DownloadSubmission, DownloadTrackerConfig, DownloadTrackerPort, EngineError, EngineRequest,
    NoopDownloadEmitter, NotificationVisibility, StopOutcome, SubmissionAck,
};
pub use settings::{
    DEFAULT_LOG_LEVEL, ENV_DOWNLOADS_DIR, ENV_POLL_INTERVAL_MS, Settings, SettingsError,
    SettingsUpdate, validate_settings,
};
pub use utils::{FileInfo, file_info, mime_from_path};
