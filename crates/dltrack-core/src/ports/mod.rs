//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the tracker expects from infrastructure and
//! the interface it offers to callers. They contain no implementation details
//! and use only domain types.

pub mod download_engine;
pub mod download_event_emitter;
pub mod download_tracker;

pub use download_engine::{
    DownloadEnginePort, EngineError, EngineRequest, NotificationVisibility,
};
pub use download_event_emitter::{DownloadEventEmitterPort, NoopDownloadEmitter};
pub use download_tracker::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_POLL_INTERVAL, DownloadSubmission, DownloadTrackerConfig,
    DownloadTrackerPort, StopOutcome, SubmissionAck,
};
