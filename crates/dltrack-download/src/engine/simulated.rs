//! Time-driven engine used by the CLI demo.
//!
//! Transfers advance at a fixed rate from the moment they are enqueued. No
//! bytes are written anywhere.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use dltrack_core::download::status::code_for_reason;
use dltrack_core::download::{EngineHandle, EngineStatus, FailureReason};
use dltrack_core::ports::{DownloadEnginePort, EngineError, EngineRequest};

/// Shape of every simulated transfer.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Size of each transfer.
    pub total_bytes: u64,
    /// Transfer rate once running.
    pub bytes_per_second: u64,
    /// Time spent pending before bytes start flowing.
    pub start_delay: Duration,
    /// Fail halfway with this reason instead of completing.
    pub failure: Option<FailureReason>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_bytes: 10 * 1024 * 1024,
            bytes_per_second: 2 * 1024 * 1024,
            start_delay: Duration::from_millis(500),
            failure: None,
        }
    }
}

impl SimulationConfig {
    /// Set the transfer size.
    #[must_use]
    pub const fn with_total_bytes(mut self, total_bytes: u64) -> Self {
        self.total_bytes = total_bytes;
        self
    }

    /// Set the transfer rate.
    #[must_use]
    pub const fn with_rate(mut self, bytes_per_second: u64) -> Self {
        self.bytes_per_second = bytes_per_second;
        self
    }

    /// Set the pending delay.
    #[must_use]
    pub const fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Make every transfer fail halfway.
    #[must_use]
    pub const fn with_failure(mut self, reason: FailureReason) -> Self {
        self.failure = Some(reason);
        self
    }
}

/// Engine whose transfers progress with the tokio clock.
#[derive(Debug)]
pub struct SimulatedEngine {
    config: SimulationConfig,
    started: Mutex<HashMap<EngineHandle, Instant>>,
    next_handle: AtomicU64,
}

impl SimulatedEngine {
    /// Create an engine with the given transfer shape.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            started: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Status of a transfer that has been alive for `elapsed`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn status_after(&self, elapsed: Duration) -> EngineStatus {
        let total = self.config.total_bytes;
        let total_i64 = i64::try_from(total).unwrap_or(i64::MAX);

        let Some(running_for) = elapsed.checked_sub(self.config.start_delay) else {
            return EngineStatus::pending(total_i64);
        };

        let transferred =
            (running_for.as_secs_f64() * self.config.bytes_per_second as f64).min(total as f64)
                as u64;

        if let Some(reason) = self.config.failure {
            let halfway = total / 2;
            if transferred >= halfway {
                return EngineStatus::failed(
                    i64::try_from(halfway).unwrap_or(i64::MAX),
                    total_i64,
                    code_for_reason(reason),
                );
            }
        }

        if transferred >= total {
            EngineStatus::successful(total_i64)
        } else {
            EngineStatus::running(i64::try_from(transferred).unwrap_or(i64::MAX), total_i64)
        }
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[async_trait]
impl DownloadEnginePort for SimulatedEngine {
    async fn enqueue(&self, request: EngineRequest) -> Result<EngineHandle, EngineError> {
        if self.config.bytes_per_second == 0 {
            return Err(EngineError::Rejected("transfer rate is zero".to_string()));
        }

        let handle = EngineHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.started.lock().await.insert(handle, Instant::now());

        tracing::debug!(
            handle = %handle,
            url = %request.url,
            destination = %request.destination.display(),
            headers = request.headers.len(),
            network = request.network.as_str(),
            "Simulated transfer enqueued"
        );
        Ok(handle)
    }

    async fn query(&self, handle: EngineHandle) -> Result<Option<EngineStatus>, EngineError> {
        let started = self.started.lock().await.get(&handle).copied();
        Ok(started.map(|at| self.status_after(at.elapsed())))
    }

    async fn remove(&self, handle: EngineHandle) -> Result<u32, EngineError> {
        Ok(u32::from(self.started.lock().await.remove(&handle).is_some()))
    }
}
