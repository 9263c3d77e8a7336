//! Download lifecycle tracker.
//!
//! Tracks engine transfers by caller-assigned id, polls the engine for
//! status and emits progress, completion and failure events exactly once
//! per transition.
//!
//! - `registry` - id ↔ handle maps and per-id records
//! - `poller` - per-download poll tasks and the tick protocol
//! - `notifier` - fan-out event bus
//! - `manager` - `DownloadTrackerImpl`, the public entry point
//! - `engine` - in-process engines for tests and demos

// Re-export core types for convenience
pub use dltrack_core::download::{
    DownloadEvent, DownloadId, DownloadRecord, DownloadState, EngineHandle, EngineStatus,
    FailureReason, NetworkPolicy, StatusReport, TrackerError, TrackerResult,
};
pub use dltrack_core::ports::{
    DownloadEnginePort, DownloadEventEmitterPort, DownloadSubmission, DownloadTrackerConfig,
    DownloadTrackerPort, EngineError, EngineRequest, StopOutcome, SubmissionAck,
};

// Internal modules (pub(crate) to keep implementation private)
pub(crate) mod poller;
pub(crate) mod registry;

pub mod engine;
pub mod notifier;

mod manager;

pub use engine::{ScriptedEngine, SimulatedEngine, SimulationConfig};
pub use manager::{
    DownloadDestination, DownloadTrackerDeps, DownloadTrackerImpl, build_download_tracker,
};
pub use notifier::{EventBus, EventSubscription};

