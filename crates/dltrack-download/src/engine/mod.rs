//! In-process engine adapters.
//!
//! Real deployments plug their own `DownloadEnginePort` (an OS download
//! service, an HTTP client). These two cover tests and the CLI demo.

mod scripted;
mod simulated;

pub use scripted::ScriptedEngine;
pub use simulated::{SimulatedEngine, SimulationConfig};
