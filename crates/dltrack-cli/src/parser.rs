//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use dltrack_core::SettingsUpdate;

use crate::commands::Commands;

/// Command-line interface for the download tracker.
///
/// Global options override the settings file and the environment.
#[derive(Parser)]
#[command(name = "dltrack")]
#[command(about = "Track asynchronous downloads and their progress events")]
#[command(version)]
pub struct Cli {
    /// JSON settings file
    #[arg(long = "config", env = "DLTRACK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Override the downloads directory for this invocation
    #[arg(long = "downloads-dir", global = true)]
    pub downloads_dir: Option<String>,

    /// Override the poll interval (milliseconds)
    #[arg(long = "poll-interval-ms", global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Settings overrides carried by the global flags.
    pub fn settings_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            downloads_directory: self.downloads_dir.clone().map(Some),
            poll_interval_ms: self.poll_interval_ms.map(Some),
            event_capacity: None,
            log_level: self.verbose.then(|| Some("debug".to_string())),
        }
    }
}
