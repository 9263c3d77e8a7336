//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where the tracker is wired together for the
//! CLI adapter: settings, the simulated engine and the event bus.

use std::path::Path;
use std::sync::Arc;

use dltrack_core::{Settings, validate_settings};
use dltrack_download::{
    DownloadTrackerDeps, DownloadTrackerImpl, EventBus, SimulatedEngine, SimulationConfig,
    build_download_tracker,
};

use crate::error::CliError;
use crate::parser::Cli;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Effective settings after file, environment and flags.
    pub settings: Settings,
}

impl CliConfig {
    /// Resolve settings for an invocation.
    ///
    /// Precedence, lowest first: defaults, settings file, environment,
    /// command-line flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    fn resolve<F>(cli: &Cli, env: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match cli.config.as_deref() {
            Some(path) => Settings::load(path)?,
            None => Settings::with_defaults(),
        };
        settings.apply_env(env)?;
        settings.merge(&cli.settings_update());
        validate_settings(&settings)?;
        Ok(Self { settings })
    }

    /// Log filter to use when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &str {
        self.settings.effective_log_level()
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// The tracker.
    pub tracker: Arc<DownloadTrackerImpl>,
    /// Bus the tracker emits into.
    pub events: Arc<EventBus>,
}

/// Wire a tracker over a simulated engine.
pub fn bootstrap(config: &CliConfig, simulation: SimulationConfig) -> Result<CliContext, CliError> {
    let tracker_config = config.settings.to_tracker_config()?;
    ensure_directory(&tracker_config.downloads_directory)?;

    let events = Arc::new(EventBus::new(tracker_config.event_capacity));
    let tracker = build_download_tracker(DownloadTrackerDeps {
        engine: Arc::new(SimulatedEngine::new(simulation)),
        event_emitter: Arc::clone(&events),
        config: tracker_config,
    });

    tracing::debug!(
        target: "dltrack.cli",
        downloads_dir = %tracker.config().downloads_directory.display(),
        "Tracker ready"
    );

    Ok(CliContext {
        tracker: Arc::new(tracker),
        events,
    })
}

fn ensure_directory(dir: &Path) -> Result<(), CliError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| {
        CliError::Config(format!(
            "cannot create downloads directory {}: {e}",
            dir.display()
        ))
    })
}
