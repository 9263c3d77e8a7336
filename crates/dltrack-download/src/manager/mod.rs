//! Download tracker implementation.
//!
//! This module provides the concrete implementation of `DownloadTrackerPort`.
//!
//! # Architecture
//!
//! - **Registry**: id ↔ handle maps and per-id records, behind one mutex
//! - **Poller**: one task per tracked id, commits engine rows to the registry
//! - **Notifier**: whatever `DownloadEventEmitterPort` the caller injects
//!
//! # Concurrency Model
//!
//! - All registry mutations are serialised by one `tokio::sync::Mutex`
//! - Engine calls never run while that lock is held
//! - Lease tokens prevent stale commits after `stop`
//! - Only an id's poll task ticks it; engine notifications wake that task
//! - Submissions reserve their id before enqueueing, so two concurrent
//!   submissions of one id cannot both reach the engine

mod paths;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, oneshot};

use dltrack_core::download::{
    DownloadId, DownloadRecord, DownloadState, EngineHandle, StatusReport, TrackerError,
    TrackerResult, translate,
};
use dltrack_core::ports::{
    DownloadEnginePort, DownloadEventEmitterPort, DownloadSubmission, DownloadTrackerConfig,
    DownloadTrackerPort, EngineRequest, StopOutcome, SubmissionAck,
};
use dltrack_core::utils::{FileInfo, file_info};

use crate::poller::Poller;
use crate::registry::Registry;

pub use paths::DownloadDestination;

/// Dependencies for creating a download tracker.
pub struct DownloadTrackerDeps<En, Em>
where
    En: DownloadEnginePort + 'static,
    Em: DownloadEventEmitterPort + 'static,
{
    /// Engine performing the transfers.
    pub engine: Arc<En>,
    /// Port for emitting download events.
    pub event_emitter: Arc<Em>,
    /// Configuration for the tracker.
    pub config: DownloadTrackerConfig,
}

/// Build a download tracker from its dependencies.
///
/// Returns an implementation of `DownloadTrackerPort` that can be stored as
/// `Arc<dyn DownloadTrackerPort>` by adapters.
pub fn build_download_tracker<En, Em>(deps: DownloadTrackerDeps<En, Em>) -> DownloadTrackerImpl
where
    En: DownloadEnginePort + 'static,
    Em: DownloadEventEmitterPort + 'static,
{
    DownloadTrackerImpl::new(deps.engine, deps.event_emitter, deps.config)
}

/// Concrete implementation of the download tracker.
pub struct DownloadTrackerImpl {
    /// Tracked downloads.
    registry: Arc<Mutex<Registry>>,
    /// Engine performing the transfers.
    engine: Arc<dyn DownloadEnginePort>,
    /// Runs ticks against the shared registry.
    poller: Poller,
    /// Configuration.
    config: DownloadTrackerConfig,
}

impl DownloadTrackerImpl {
    /// Create a new tracker.
    pub fn new<En, Em>(engine: Arc<En>, event_emitter: Arc<Em>, config: DownloadTrackerConfig) -> Self
    where
        En: DownloadEnginePort + 'static,
        Em: DownloadEventEmitterPort + 'static,
    {
        let engine: Arc<dyn DownloadEnginePort> = engine;
        let registry = Arc::new(Mutex::new(Registry::new()));
        let poller = Poller::new(
            Arc::clone(&registry),
            Arc::clone(&engine),
            event_emitter as Arc<dyn DownloadEventEmitterPort>,
            config.poll_interval,
        );

        Self {
            registry,
            engine,
            poller,
            config,
        }
    }

    /// Crate version, reported to callers that ask for the plugin version.
    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Active configuration.
    pub const fn config(&self) -> &DownloadTrackerConfig {
        &self.config
    }

    /// Number of tracked downloads.
    pub async fn tracked_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Clones of every tracked record, ordered by id.
    pub async fn snapshot(&self) -> Vec<DownloadRecord> {
        self.registry.lock().await.records()
    }

    /// Last committed record for one id.
    pub async fn record(&self, id: &DownloadId) -> TrackerResult<DownloadRecord> {
        self.registry
            .lock()
            .await
            .get(id)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| TrackerError::not_found(id.as_str()))
    }

    /// React to an engine-pushed notification for `handle`.
    ///
    /// Maps the handle back to its id and wakes that download's poll task
    /// for an immediate tick. Returns `false` when the handle belongs to no
    /// tracked download.
    pub async fn handle_engine_notification(&self, handle: EngineHandle) -> bool {
        let target = {
            let registry = self.registry.lock().await;
            registry.lookup_id(handle).ok().and_then(|id| {
                registry
                    .get(id)
                    .map(|entry| (id.clone(), Arc::clone(&entry.wake)))
            })
        };

        let Some((id, wake)) = target else {
            tracing::debug!(
                target: "dltrack.download",
                handle = %handle,
                "Notification for untracked handle ignored"
            );
            return false;
        };

        tracing::debug!(target: "dltrack.download", id = %id, handle = %handle, "Engine notification");
        wake.notify_one();
        true
    }

    /// Cancel every poll task and forget all tracked downloads.
    ///
    /// Engine transfers are left alone. Returns how many downloads were
    /// tracked.
    pub async fn shutdown(&self) -> usize {
        let entries = self.registry.lock().await.drain();
        for entry in &entries {
            entry.cancel.cancel();
        }
        tracing::info!(
            target: "dltrack.download",
            count = entries.len(),
            "Shutdown: cancelled poll tasks"
        );
        entries.len()
    }

    /// Validate a submission and build the engine request.
    fn prepare(&self, submission: DownloadSubmission) -> TrackerResult<(DownloadId, EngineRequest)> {
        if submission.id.is_blank() {
            return Err(TrackerError::invalid_argument("missing id"));
        }

        let raw_url = submission.url.trim();
        if raw_url.is_empty() {
            return Err(TrackerError::invalid_argument("missing url"));
        }
        let url = url::Url::parse(raw_url)
            .map_err(|e| TrackerError::invalid_argument(format!("invalid url '{raw_url}': {e}")))?;

        let destination =
            DownloadDestination::plan(&self.config.downloads_directory, &submission.destination)?;

        let request = EngineRequest::new(url, destination.path())
            .with_headers(submission.headers)
            .with_network(submission.network);

        Ok((submission.id, request))
    }
}

#[async_trait]
impl DownloadTrackerPort for DownloadTrackerImpl {
    async fn download(&self, submission: DownloadSubmission) -> TrackerResult<SubmissionAck> {
        let (id, request) = self.prepare(submission)?;

        self.registry.lock().await.reserve(&id)?;

        let destination = request.destination.clone();
        let handle = match self.engine.enqueue(request).await {
            Ok(handle) => handle,
            Err(e) => {
                self.registry.lock().await.release(&id);
                tracing::warn!(target: "dltrack.download", id = %id, error = %e, "Enqueue failed");
                return Err(e.into());
            }
        };

        let registered = {
            let mut registry = self.registry.lock().await;
            let registered = registry.register(id.clone(), handle);
            if registered.is_err() {
                registry.release(&id);
            }
            registered
        };
        let registration = match registered {
            Ok(registration) => registration,
            Err(e @ TrackerError::Engine { .. }) => {
                // The handle belongs to another tracked download
                tracing::warn!(
                    target: "dltrack.download",
                    id = %id,
                    handle = %handle,
                    error = %e,
                    "Engine returned a handle that is already tracked"
                );
                return Err(e);
            }
            Err(e) => {
                if let Err(remove_err) = self.engine.remove(handle).await {
                    tracing::warn!(
                        target: "dltrack.download",
                        id = %id,
                        handle = %handle,
                        error = %remove_err,
                        "Could not remove orphaned transfer"
                    );
                }
                return Err(e);
            }
        };

        let (gate_tx, gate_rx) = oneshot::channel();
        self.poller.spawn(id.clone(), registration, gate_rx);

        tracing::info!(
            target: "dltrack.download",
            id = %id,
            handle = %handle,
            destination = %destination.display(),
            "Download enqueued"
        );

        let ack = SubmissionAck {
            id,
            status: DownloadState::Pending,
        };
        // First tick only after the acknowledgement is built
        let _ = gate_tx.send(());
        Ok(ack)
    }

    async fn stop(&self, id: &DownloadId) -> TrackerResult<StopOutcome> {
        let entry = {
            let mut registry = self.registry.lock().await;
            let entry = registry.remove(id)?;
            entry.cancel.cancel();
            entry
        };
        let handle = entry.record.handle;

        let rows = self.engine.remove(handle).await.map_err(|e| {
            tracing::warn!(
                target: "dltrack.download",
                id = %id,
                handle = %handle,
                error = %e,
                "Engine removal failed after tracking stopped"
            );
            TrackerError::from(e)
        })?;

        tracing::info!(target: "dltrack.download", id = %id, handle = %handle, rows, "Download stopped");
        Ok(StopOutcome { removed: rows > 0 })
    }

    async fn discard(&self, id: &DownloadId) -> TrackerResult<()> {
        let entry = self.registry.lock().await.discard(id)?;
        entry.cancel.cancel();
        tracing::info!(
            target: "dltrack.download",
            id = %id,
            handle = %entry.record.handle,
            state = %entry.record.state,
            "Download discarded"
        );
        Ok(())
    }

    async fn check_status(&self, id: &DownloadId) -> TrackerResult<StatusReport> {
        let handle = self.registry.lock().await.lookup_handle(id)?;

        let status = self
            .engine
            .query(handle)
            .await?
            .ok_or_else(|| TrackerError::not_found(id.as_str()))?;

        Ok(StatusReport::from(&translate(&status)))
    }

    async fn pause(&self, id: &DownloadId) -> TrackerResult<()> {
        tracing::debug!(target: "dltrack.download", id = %id, "Pause requested");
        Err(TrackerError::unsupported("pause"))
    }

    async fn resume(&self, id: &DownloadId) -> TrackerResult<()> {
        tracing::debug!(target: "dltrack.download", id = %id, "Resume requested");
        Err(TrackerError::unsupported("resume"))
    }

    async fn get_file_info(&self, path: &str) -> TrackerResult<FileInfo> {
        file_info(path).await
    }
}
