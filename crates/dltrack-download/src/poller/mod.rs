//! Per-download poll tasks.
//!
//! # Tick protocol
//!
//! 1. Read the handle for `(id, lease)` under the registry lock.
//! 2. Query the engine with the lock released.
//! 3. Re-lock, re-check the lease, commit the translated row and emit while
//!    still holding the lock.
//!
//! `stop` removes the entry and cancels its token under the same lock, so a
//! tick that lost the race finds no entry in step 3 and emits nothing.
//!
//! Only the poll task of an entry runs its ticks. Engine notifications wake
//! that task instead of ticking on the caller's side, so two queries for one
//! id never overlap and rows are committed in query order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use dltrack_core::download::{DownloadEvent, DownloadId, Transition, translate};
use dltrack_core::ports::{DownloadEnginePort, DownloadEventEmitterPort};

use crate::registry::{LeaseId, Registration, Registry};

/// What the poll loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep polling.
    Continue,
    /// The download is terminal, untracked or replaced.
    Finished,
}

/// Shared handles needed to run ticks.
#[derive(Clone)]
pub struct Poller {
    registry: Arc<Mutex<Registry>>,
    engine: Arc<dyn DownloadEnginePort>,
    emitter: Arc<dyn DownloadEventEmitterPort>,
    poll_interval: Duration,
}

impl Poller {
    /// Create a poller over the shared registry.
    pub fn new(
        registry: Arc<Mutex<Registry>>,
        engine: Arc<dyn DownloadEnginePort>,
        emitter: Arc<dyn DownloadEventEmitterPort>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            engine,
            emitter,
            poll_interval,
        }
    }

    /// Spawn the poll task for one download.
    ///
    /// The task does not tick before `gate` fires. The submitter opens it once
    /// the acknowledgement has been built, so no event for `id` is emitted
    /// while the submission is still being registered. A dropped gate ends
    /// the task.
    pub fn spawn(
        &self,
        id: DownloadId,
        registration: Registration,
        gate: oneshot::Receiver<()>,
    ) -> JoinHandle<()> {
        let poller = self.clone();
        tokio::spawn(async move {
            let Registration {
                lease,
                cancel,
                wake,
            } = registration;
            poller.run(id, lease, cancel, wake, gate).await;
        })
    }

    async fn run(
        &self,
        id: DownloadId,
        lease: LeaseId,
        cancel: CancellationToken,
        wake: Arc<Notify>,
        gate: oneshot::Receiver<()>,
    ) {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            opened = gate => {
                if opened.is_err() {
                    tracing::debug!(target: "dltrack.download", id = %id, "Poll gate dropped");
                    return;
                }
            }
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            target: "dltrack.download",
            id = %id,
            lease = lease.raw(),
            interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "Polling started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(target: "dltrack.download", id = %id, "Polling cancelled");
                    break;
                }
                _ = ticker.tick() => {}
                () = wake.notified() => {
                    tracing::debug!(target: "dltrack.download", id = %id, "Woken by engine notification");
                }
            }

            if self.tick(&id, lease).await == TickOutcome::Finished {
                break;
            }
        }
    }

    /// Run one status check for `(id, lease)`.
    async fn tick(&self, id: &DownloadId, lease: LeaseId) -> TickOutcome {
        let handle = {
            let registry = self.registry.lock().await;
            match registry.active_handle(id, lease) {
                Some(handle) => handle,
                None => return TickOutcome::Finished,
            }
        };

        let status = match self.engine.query(handle).await {
            Ok(Some(status)) => status,
            Ok(None) => {
                tracing::warn!(
                    target: "dltrack.download",
                    id = %id,
                    handle = %handle,
                    "Engine has no row for handle, skipping tick"
                );
                return TickOutcome::Continue;
            }
            Err(e) => {
                tracing::warn!(
                    target: "dltrack.download",
                    id = %id,
                    handle = %handle,
                    error = %e,
                    "Status query failed, skipping tick"
                );
                return TickOutcome::Continue;
            }
        };

        let translation = translate(&status);

        let mut registry = self.registry.lock().await;
        let Some(commit) = registry.commit(id, lease, &translation) else {
            tracing::debug!(target: "dltrack.download", id = %id, "Ignoring stale tick");
            return TickOutcome::Finished;
        };

        self.emitter
            .emit(DownloadEvent::progress(id.clone(), commit.progress));

        match commit.transition {
            Transition::Unchanged => TickOutcome::Continue,
            Transition::Started => {
                tracing::debug!(target: "dltrack.download", id = %id, "Download running");
                TickOutcome::Continue
            }
            Transition::Completed => {
                self.emitter.emit(DownloadEvent::completed(id.clone()));
                tracing::info!(target: "dltrack.download", id = %id, "Download completed");
                TickOutcome::Finished
            }
            Transition::Failed(reason) => {
                self.emitter.emit(DownloadEvent::failed(id.clone(), reason));
                tracing::warn!(
                    target: "dltrack.download",
                    id = %id,
                    reason = %reason,
                    "Download failed"
                );
                TickOutcome::Finished
            }
        }
    }
}
