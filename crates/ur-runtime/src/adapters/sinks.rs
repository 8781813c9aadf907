//! # Change Sink Adapters
//!
//! - `TracingSink`: one structured log line per notification.
//! - `MemorySink`: keeps everything, for tests and audits in-process.
//! - `BroadcastSink`: fans out over a `tokio::sync::broadcast` channel to
//!   async subscribers. Lagging or absent receivers never block the
//!   runtime.

use parking_lot::Mutex;
use shared_types::{ChangeNotification, ChangeSink, Component, NotificationPayload};
use tokio::sync::broadcast;
use ur_telemetry::log_event;

/// Logs every notification through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl ChangeSink for TracingSink {
    fn publish(&self, notification: ChangeNotification) {
        match &notification.payload {
            NotificationPayload::SlotChange { namespace, key, .. } => {
                log_event!(
                    debug,
                    notification.component,
                    "Slot changed",
                    event = notification.event_kind,
                    namespace = %String::from_utf8_lossy(namespace),
                    key = %hex::encode(key)
                );
            }
            NotificationPayload::Fields(fields) => {
                log_event!(
                    info,
                    notification.component,
                    "Runtime event",
                    event = notification.event_kind,
                    fields = ?fields
                );
            }
        }
    }
}

/// Collects notifications in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ChangeNotification>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far.
    #[must_use]
    pub fn events(&self) -> Vec<ChangeNotification> {
        self.events.lock().clone()
    }

    /// Notifications from `component` with kind `event_kind`.
    #[must_use]
    pub fn of_kind(&self, component: Component, event_kind: &str) -> Vec<ChangeNotification> {
        self.events
            .lock()
            .iter()
            .filter(|n| n.component == component && n.event_kind == event_kind)
            .cloned()
            .collect()
    }

    /// Number of notifications received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drops everything received so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ChangeSink for MemorySink {
    fn publish(&self, notification: ChangeNotification) {
        self.events.lock().push(notification);
    }
}

/// Broadcasts notifications to async subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<ChangeNotification>,
}

impl BroadcastSink {
    /// Creates a sink whose channel buffers `capacity` notifications per
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New receiver; sees notifications published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.sender.subscribe()
    }

    /// Current number of receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ChangeSink for BroadcastSink {
    fn publish(&self, notification: ChangeNotification) {
        // Err only means nobody is listening.
        let _ = self.sender.send(notification);
    }
}
