//! Registry of tracked downloads.
//!
//! Pure synchronous state: forward map id → entry, reverse map handle → id,
//! and the set of ids reserved by in-flight submissions. No I/O, no tracing.
//!
//! This is a sync type with no internal locking. The tracker keeps it behind
//! one `tokio::sync::Mutex` and every mutation goes through that lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use dltrack_core::download::{
    DownloadId, DownloadRecord, EngineHandle, TrackerError, TrackerResult, Transition,
    Translation,
};

/// Generation number of a registry entry.
///
/// A poll task remembers the lease it was started with; once the entry is
/// removed or replaced the lease no longer matches and the task's commits
/// are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseId(u64);

impl LeaseId {
    /// Raw lease value, for logging.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// One tracked download.
#[derive(Debug)]
pub struct Entry {
    /// Last committed record.
    pub record: DownloadRecord,
    /// Lease minted at registration.
    pub lease: LeaseId,
    /// Stops the poll task for this entry.
    pub cancel: CancellationToken,
    /// Asks the poll task for an immediate tick.
    pub wake: Arc<Notify>,
}

/// What a poll task needs to follow a freshly registered entry.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Lease minted for the entry.
    pub lease: LeaseId,
    /// Cancelled when the entry is removed.
    pub cancel: CancellationToken,
    /// Notified when the engine pushes an update for the handle.
    pub wake: Arc<Notify>,
}

/// Result of committing one translated status row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Commit {
    /// Progress fraction of the committed row.
    pub progress: f64,
    /// State change caused by the row.
    pub transition: Transition,
}

/// Tracked downloads keyed both ways.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<DownloadId, Entry>,
    by_handle: HashMap<EngineHandle, DownloadId>,
    reserved: HashSet<DownloadId>,
    next_lease: u64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked downloads (reservations excluded).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Claim an id before asking the engine to enqueue.
    ///
    /// Fails with `DuplicateId` when the id is tracked or another submission
    /// already holds the reservation.
    pub fn reserve(&mut self, id: &DownloadId) -> TrackerResult<()> {
        if self.entries.contains_key(id) || !self.reserved.insert(id.clone()) {
            return Err(TrackerError::duplicate_id(id.as_str()));
        }
        Ok(())
    }

    /// Drop a reservation after a failed enqueue.
    pub fn release(&mut self, id: &DownloadId) -> bool {
        self.reserved.remove(id)
    }

    /// Start tracking `id` with the handle the engine returned.
    ///
    /// Consumes the reservation for `id`, if any. Fails with `DuplicateId`
    /// when `id` is tracked and with `Engine` when another id already owns
    /// `handle`; the registry is unchanged in both cases.
    pub fn register(&mut self, id: DownloadId, handle: EngineHandle) -> TrackerResult<Registration> {
        if self.entries.contains_key(&id) {
            return Err(TrackerError::duplicate_id(id.as_str()));
        }
        if let Some(owner) = self.by_handle.get(&handle) {
            return Err(TrackerError::engine(format!(
                "engine handle {handle} is already owned by '{owner}'"
            )));
        }
        self.reserved.remove(&id);

        self.next_lease += 1;
        let registration = Registration {
            lease: LeaseId(self.next_lease),
            cancel: CancellationToken::new(),
            wake: Arc::new(Notify::new()),
        };

        self.by_handle.insert(handle, id.clone());
        self.entries.insert(
            id.clone(),
            Entry {
                record: DownloadRecord::new(id, handle),
                lease: registration.lease,
                cancel: registration.cancel.clone(),
                wake: Arc::clone(&registration.wake),
            },
        );

        Ok(registration)
    }

    /// Handle owned by a tracked id.
    pub fn lookup_handle(&self, id: &DownloadId) -> TrackerResult<EngineHandle> {
        self.entries
            .get(id)
            .map(|entry| entry.record.handle)
            .ok_or_else(|| TrackerError::not_found(id.as_str()))
    }

    /// Id owning an engine handle.
    pub fn lookup_id(&self, handle: EngineHandle) -> TrackerResult<&DownloadId> {
        self.by_handle
            .get(&handle)
            .ok_or_else(|| TrackerError::not_found(handle.to_string()))
    }

    /// Entry for a tracked id.
    pub fn get(&self, id: &DownloadId) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Handle to poll for `id`, if the lease still matches and the record is
    /// not terminal yet.
    pub fn active_handle(&self, id: &DownloadId, lease: LeaseId) -> Option<EngineHandle> {
        self.entries
            .get(id)
            .filter(|entry| entry.lease == lease && !entry.record.state.is_terminal())
            .map(|entry| entry.record.handle)
    }

    /// Commit a translated row to the record of `id`.
    ///
    /// Returns `None` when the entry is gone, the lease no longer matches or
    /// the record was already terminal. Nothing must be emitted in that case.
    pub fn commit(
        &mut self,
        id: &DownloadId,
        lease: LeaseId,
        translation: &Translation,
    ) -> Option<Commit> {
        let entry = self.entries.get_mut(id)?;
        if entry.lease != lease || entry.record.state.is_terminal() {
            return None;
        }

        let transition = entry.record.apply(translation);
        Some(Commit {
            progress: translation.progress,
            transition,
        })
    }

    /// Stop tracking `id`.
    ///
    /// Removes both index entries. The caller decides whether to cancel the
    /// returned entry's token.
    pub fn remove(&mut self, id: &DownloadId) -> TrackerResult<Entry> {
        let entry = self
            .entries
            .remove(id)
            .ok_or_else(|| TrackerError::not_found(id.as_str()))?;
        self.by_handle.remove(&entry.record.handle);
        Ok(entry)
    }

    /// Stop tracking a terminal `id` and hand back its entry.
    ///
    /// Fails with `NotFound` when `id` is untracked and with
    /// `InvalidArgument` while it is still pending or running.
    pub fn discard(&mut self, id: &DownloadId) -> TrackerResult<Entry> {
        let state = self
            .entries
            .get(id)
            .map(|entry| entry.record.state)
            .ok_or_else(|| TrackerError::not_found(id.as_str()))?;
        if !state.is_terminal() {
            return Err(TrackerError::invalid_argument(format!(
                "download '{id}' is still {state}"
            )));
        }
        self.remove(id)
    }

    /// Remove every entry and reservation.
    pub fn drain(&mut self) -> Vec<Entry> {
        self.by_handle.clear();
        self.reserved.clear();
        self.entries.drain().map(|(_, entry)| entry).collect()
    }

    /// Clones of all records, ordered by id.
    pub fn records(&self) -> Vec<DownloadRecord> {
        let mut records: Vec<_> = self
            .entries
            .values()
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        records
    }
}
