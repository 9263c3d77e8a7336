//! In-process event bus for download events.
//!
//! The poller pushes events here; any number of subscribers receive them.
//! Delivery is decoupled from polling: `emit` never waits on a subscriber.
//!
//! Each subscriber owns an unbounded queue. `capacity` bounds how many
//! undelivered *progress* events a subscriber may hold; past that, further
//! progress events for it are dropped. Completion and failure events are
//! always queued, so a slow subscriber still sees every terminal event, in
//! order after the progress it did receive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use dltrack_core::download::DownloadEvent;
use dltrack_core::ports::{DEFAULT_EVENT_CAPACITY, DownloadEventEmitterPort};

#[derive(Debug)]
struct Subscriber {
    sender: mpsc::UnboundedSender<DownloadEvent>,
    backlog: Arc<AtomicUsize>,
}

impl Subscriber {
    fn push(&self, event: DownloadEvent) -> bool {
        self.backlog.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(event).is_err() {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }
}

/// Receiving end of one subscription.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: mpsc::UnboundedReceiver<DownloadEvent>,
    backlog: Arc<AtomicUsize>,
}

impl EventSubscription {
    /// Wait for the next event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<DownloadEvent> {
        let event = self.receiver.recv().await?;
        self.backlog.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// Take the next event if one is queued.
    pub fn try_recv(&mut self) -> Result<DownloadEvent, TryRecvError> {
        let event = self.receiver.try_recv()?;
        self.backlog.fetch_sub(1, Ordering::AcqRel);
        Ok(event)
    }

    /// Number of queued events.
    pub fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Acquire)
    }
}

/// Fan-out bus that implements the event emitter port.
///
/// Clones share the same subscriber list.
#[derive(Debug, Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus queueing up to `capacity` progress events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
        }
    }

    /// Create a bus with the default capacity (256 events).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let backlog = Arc::new(AtomicUsize::new(0));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                sender,
                backlog: Arc::clone(&backlog),
            });
        EventSubscription { receiver, backlog }
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|subscriber| !subscriber.sender.is_closed())
            .count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl DownloadEventEmitterPort for EventBus {
    fn emit(&self, event: DownloadEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Closed subscriptions are pruned here
        subscribers.retain(|subscriber| {
            if !event.is_terminal() && subscriber.backlog.load(Ordering::Acquire) >= self.capacity
            {
                tracing::trace!(
                    target: "dltrack.download",
                    id = %event.id(),
                    "Progress dropped for slow subscriber"
                );
                return !subscriber.sender.is_closed();
            }
            subscriber.push(event.clone())
        });
    }

    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_receives_events() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(DownloadEvent::progress("a", 0.5));
        bus.emit(DownloadEvent::completed("a"));

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap(), DownloadEvent::progress("a", 0.5));
            assert_eq!(rx.recv().await.unwrap(), DownloadEvent::completed("a"));
            assert_eq!(rx.backlog(), 0);
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::with_defaults();
        bus.emit(DownloadEvent::completed("a"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_boxed_clone_shares_the_subscribers() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        let boxed = bus.clone_box();

        boxed.emit(DownloadEvent::completed("z"));
        assert_eq!(rx.recv().await.unwrap(), DownloadEvent::completed("z"));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_every_terminal_event() {
        let bus = EventBus::new(2);
        let mut slow = bus.subscribe();

        for id in ["a", "b", "c"] {
            bus.emit(DownloadEvent::progress(id, 1.0));
            bus.emit(DownloadEvent::completed(id));
        }

        let mut received = Vec::new();
        while let Ok(event) = slow.try_recv() {
            received.push(event);
        }

        let completed: Vec<_> = received
            .iter()
            .filter(|e| e.is_terminal())
            .map(|e| e.id().as_str().to_string())
            .collect();
        assert_eq!(completed, ["a", "b", "c"]);

        // Progress past the backlog limit is dropped
        assert_eq!(received[0], DownloadEvent::progress("a", 1.0));
        assert_eq!(received.len(), 4);
        assert_eq!(slow.backlog(), 0);
    }

    #[tokio::test]
    async fn test_progress_resumes_once_subscriber_catches_up() {
        let bus = EventBus::new(1);
        let mut rx = bus.subscribe();

        bus.emit(DownloadEvent::progress("a", 0.1));
        bus.emit(DownloadEvent::progress("a", 0.2));
        assert_eq!(rx.recv().await.unwrap(), DownloadEvent::progress("a", 0.1));

        bus.emit(DownloadEvent::progress("a", 0.3));
        assert_eq!(rx.recv().await.unwrap(), DownloadEvent::progress("a", 0.3));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let bus = EventBus::new(4);
        let rx = bus.subscribe();
        drop(rx);

        bus.emit(DownloadEvent::completed("a"));
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.subscribers.lock().unwrap().is_empty());
    }
}
