//! CLI-specific error types and mappings.
//!
//! Maps tracker and settings errors to exit codes and user-facing messages.

use dltrack_core::{SettingsError, TrackerError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Tracker error.
    #[error("{0}")]
    Tracker(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 78: Configuration error (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Tracker(_) => 1,
            Self::Arguments(_) => 2,
            Self::Config(_) => 78,
        }
    }
}

impl From<TrackerError> for CliError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::InvalidArgument { message } => Self::Arguments(message),
            other => Self::Tracker(other.user_message()),
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}
