//! Tracker error types.
//!
//! These errors are serializable so adapters can forward them as-is. Every
//! variant carries a stable reason code (see [`TrackerError::code`]) plus
//! free-text detail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for caller-facing tracker operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum TrackerError {
    /// A required field is missing or malformed.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the input.
        message: String,
    },

    /// The ID is already tracked (or being submitted).
    #[error("Duplicate download id: {id}")]
    DuplicateId {
        /// The conflicting ID.
        id: String,
    },

    /// The ID is not tracked.
    #[error("Download not found: {id}")]
    NotFound {
        /// The unknown ID.
        id: String,
    },

    /// The operation cannot be implemented against the engine model.
    #[error("Unsupported operation: {operation}")]
    Unsupported {
        /// Name of the rejected operation.
        operation: String,
    },

    /// The download engine failed to enqueue, query or remove.
    #[error("Engine error: {message}")]
    Engine {
        /// Engine-provided detail.
        message: String,
    },
}

impl TrackerError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a duplicate ID error.
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    /// Create a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create an engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Stable reason code for callers that branch on the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::DuplicateId { .. } => "DUPLICATE_ID",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unsupported { .. } => "UNSUPPORTED",
            Self::Engine { .. } => "ENGINE_ERROR",
        }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument { message } => format!("Missing or invalid parameter: {message}"),
            Self::DuplicateId { id } => {
                format!("A download with id '{id}' is already being tracked.")
            }
            Self::NotFound { id } => format!("Download '{id}' not found."),
            Self::Unsupported { operation } => {
                format!("{operation} is not supported for individual downloads.")
            }
            Self::Engine { message } => format!("Download engine error: {message}"),
        }
    }
}

/// Convenience result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
