//! Engine that replays scripted status rows.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use dltrack_core::download::{EngineHandle, EngineStatus};
use dltrack_core::ports::{DownloadEnginePort, EngineError, EngineRequest};

#[derive(Debug, Default)]
struct Transfer {
    script: VecDeque<EngineStatus>,
    last: Option<EngineStatus>,
    delays: VecDeque<Duration>,
    queries: usize,
}

#[derive(Debug, Default)]
struct ScriptState {
    next_handle: u64,
    pending_scripts: VecDeque<(Vec<EngineStatus>, Vec<Duration>)>,
    transfers: HashMap<EngineHandle, Transfer>,
    requests: Vec<EngineRequest>,
    removed: Vec<EngineHandle>,
    enqueue_failure: Option<String>,
}

impl ScriptState {
    fn open(&mut self, script: Vec<EngineStatus>, delays: Vec<Duration>) -> EngineHandle {
        self.next_handle += 1;
        let handle = EngineHandle::new(self.next_handle);
        self.transfers.insert(
            handle,
            Transfer {
                script: script.into(),
                delays: delays.into(),
                ..Transfer::default()
            },
        );
        handle
    }
}

/// Deterministic engine for tests and demos.
///
/// Each enqueued transfer consumes the next script pushed with
/// [`push_script`](Self::push_script). Every query pops one row; once the
/// script is exhausted the last row repeats. A transfer with an empty script
/// reports pending with an unknown size.
///
/// Queries can be slowed down per transfer with
/// [`push_slow_script`](Self::push_slow_script); the delay runs on the tokio
/// clock without holding any engine state.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    state: Mutex<ScriptState>,
}

impl ScriptedEngine {
    /// Create an engine with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the script for the next `enqueue` call.
    pub async fn push_script(&self, script: Vec<EngineStatus>) {
        self.push_slow_script(script, Vec::new()).await;
    }

    /// Queue a script whose first queries answer only after `delays`.
    ///
    /// Query `n` waits `delays[n]`; queries past the end answer at once.
    pub async fn push_slow_script(&self, script: Vec<EngineStatus>, delays: Vec<Duration>) {
        self.state
            .lock()
            .await
            .pending_scripts
            .push_back((script, delays));
    }

    /// Open a transfer directly, bypassing `enqueue`.
    pub async fn enqueue_scripted(&self, script: Vec<EngineStatus>) -> EngineHandle {
        self.state.lock().await.open(script, Vec::new())
    }

    /// Replace the remaining rows of a transfer.
    pub async fn set_script(&self, handle: EngineHandle, script: Vec<EngineStatus>) -> bool {
        let mut state = self.state.lock().await;
        state
            .transfers
            .get_mut(&handle)
            .map(|transfer| transfer.script = script.into())
            .is_some()
    }

    /// Make the next `enqueue` call fail with `Rejected`.
    pub async fn fail_next_enqueue(&self, message: impl Into<String>) {
        self.state.lock().await.enqueue_failure = Some(message.into());
    }

    /// Drop a transfer without recording a removal (the engine "forgot" it).
    pub async fn forget(&self, handle: EngineHandle) -> bool {
        self.state.lock().await.transfers.remove(&handle).is_some()
    }

    /// Every request passed to `enqueue`, in order.
    pub async fn requests(&self) -> Vec<EngineRequest> {
        self.state.lock().await.requests.clone()
    }

    /// Every handle passed to `remove`, in order.
    pub async fn removed(&self) -> Vec<EngineHandle> {
        self.state.lock().await.removed.clone()
    }

    /// How many times a handle was queried.
    pub async fn query_count(&self, handle: EngineHandle) -> usize {
        self.state
            .lock()
            .await
            .transfers
            .get(&handle)
            .map_or(0, |transfer| transfer.queries)
    }
}

#[async_trait]
impl DownloadEnginePort for ScriptedEngine {
    async fn enqueue(&self, request: EngineRequest) -> Result<EngineHandle, EngineError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.enqueue_failure.take() {
            return Err(EngineError::Rejected(message));
        }

        let (script, delays) = state.pending_scripts.pop_front().unwrap_or_default();
        state.requests.push(request);
        Ok(state.open(script, delays))
    }

    async fn query(&self, handle: EngineHandle) -> Result<Option<EngineStatus>, EngineError> {
        let (row, delay) = {
            let mut state = self.state.lock().await;
            let Some(transfer) = state.transfers.get_mut(&handle) else {
                return Ok(None);
            };

            transfer.queries += 1;
            if let Some(next) = transfer.script.pop_front() {
                transfer.last = Some(next);
            }
            (
                transfer.last.unwrap_or(EngineStatus::pending(-1)),
                transfer.delays.pop_front(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Some(row))
    }

    async fn remove(&self, handle: EngineHandle) -> Result<u32, EngineError> {
        let mut state = self.state.lock().await;
        state.removed.push(handle);
        Ok(u32::from(state.transfers.remove(&handle).is_some()))
    }
}
