//! Settings domain types and validation.
//!
//! Settings are loaded from an optional JSON file, then overridden by
//! environment variables, then by explicit updates (CLI flags). The result is
//! validated and turned into a [`DownloadTrackerConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ports::{DEFAULT_EVENT_CAPACITY, DEFAULT_POLL_INTERVAL, DownloadTrackerConfig};

/// Environment variable overriding the downloads directory.
pub const ENV_DOWNLOADS_DIR: &str = "DLTRACK_DOWNLOADS_DIR";

/// Environment variable overriding the poll interval in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "DLTRACK_POLL_INTERVAL_MS";

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Application settings structure.
///
/// All fields are optional to support partial files and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory submission destinations are resolved against.
    pub downloads_directory: Option<String>,

    /// Interval between status checks, in milliseconds (10-60000).
    pub poll_interval_ms: Option<u64>,

    /// Event bus buffer size (1-65536).
    pub event_capacity: Option<usize>,

    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_defaults() -> Self {
        Self {
            downloads_directory: None,
            poll_interval_ms: Some(DEFAULT_POLL_INTERVAL.as_millis() as u64),
            event_capacity: Some(DEFAULT_EVENT_CAPACITY),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    /// Load settings from a JSON file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut settings = Self::with_defaults();
        let file: Self = serde_json::from_str(&raw).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        settings.merge(&file.into_update());
        Ok(settings)
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// Takes a lookup function instead of reading the process environment
    /// directly so callers can test overrides without touching global state.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DOWNLOADS_DIR) {
            self.downloads_directory = Some(dir);
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            let ms = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| SettingsError::InvalidEnv {
                    key: ENV_POLL_INTERVAL_MS,
                    value: raw.clone(),
                })?;
            self.poll_interval_ms = Some(ms);
        }
        Ok(())
    }

    /// Effective poll interval (with default fallback).
    #[must_use]
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval_ms
            .map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis)
    }

    /// Effective log filter (with default fallback).
    #[must_use]
    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Merge an update into this one, only touching fields that are `Some`.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref dir) = other.downloads_directory {
            self.downloads_directory.clone_from(dir);
        }
        if let Some(ref interval) = other.poll_interval_ms {
            self.poll_interval_ms = *interval;
        }
        if let Some(ref capacity) = other.event_capacity {
            self.event_capacity = *capacity;
        }
        if let Some(ref level) = other.log_level {
            self.log_level.clone_from(level);
        }
    }

    /// Validate and build the tracker configuration.
    pub fn to_tracker_config(&self) -> Result<DownloadTrackerConfig, SettingsError> {
        validate_settings(self)?;
        let directory = self
            .downloads_directory
            .as_deref()
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        Ok(DownloadTrackerConfig::new(directory)
            .with_poll_interval(self.effective_poll_interval())
            .with_event_capacity(self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY)))
    }

    /// Turn a loaded file into an update that only overrides present fields.
    fn into_update(self) -> SettingsUpdate {
        SettingsUpdate {
            downloads_directory: self.downloads_directory.map(Some),
            poll_interval_ms: self.poll_interval_ms.map(Some),
            event_capacity: self.event_capacity.map(Some),
            log_level: self.log_level.map(Some),
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub downloads_directory: Option<Option<String>>,
    pub poll_interval_ms: Option<Option<u64>>,
    pub event_capacity: Option<Option<usize>>,
    pub log_level: Option<Option<String>>,
}

/// Settings loading or validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Poll interval must be between 10 and 60000 ms, got {0}")]
    InvalidPollInterval(u64),

    #[error("Event capacity must be between 1 and 65536, got {0}")]
    InvalidEventCapacity(usize),

    #[error("Downloads directory cannot be empty")]
    EmptyDownloadsDirectory,

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Cannot read settings file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Cannot parse settings file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(ms) = settings.poll_interval_ms {
        if !(10..=60_000).contains(&ms) {
            return Err(SettingsError::InvalidPollInterval(ms));
        }
    }

    if let Some(capacity) = settings.event_capacity {
        if !(1..=65_536).contains(&capacity) {
            return Err(SettingsError::InvalidEventCapacity(capacity));
        }
    }

    if settings
        .downloads_directory
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyDownloadsDirectory);
    }

    Ok(())
}
