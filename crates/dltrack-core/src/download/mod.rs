//! Download domain types, events, errors and status translation.
//!
//! This module contains pure data types and functions for the tracker. No
//! I/O, networking, or runtime dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Identifiers and enums (`DownloadId`, `EngineHandle`, `DownloadState`, `FailureReason`)
//! - `events` - Events pushed to subscribers (`DownloadEvent`)
//! - `errors` - Caller-facing error taxonomy (`TrackerError`)
//! - `status` - Raw engine codes and the status translator
//! - `record` - Per-download record and status report DTO

pub mod errors;
pub mod events;
pub mod record;
pub mod status;
pub mod types;

// Re-export commonly used types
pub use errors::{TrackerError, TrackerResult};
pub use events::DownloadEvent;
pub use record::{DownloadRecord, StatusReport, Transition};
pub use status::{EngineStatus, Translation, progress_fraction, translate};
pub use types::{DownloadId, DownloadState, EngineHandle, FailureReason, NetworkPolicy};
