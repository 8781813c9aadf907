//! # Change Notifications
//!
//! Every storage mutation and module activation is reported to an external
//! audit collaborator as `{component, event_kind, payload}`. Delivery is
//! best-effort and never affects the outcome of the operation that caused it.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Component that produced a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Slot writes and deletes.
    Storage,
    /// Module activations.
    ModuleRegistry,
    /// Role, ownership, and time-lock changes.
    AccessControl,
    /// Lifecycle transitions.
    PhaseMachine,
    /// Commit and reveal events.
    CommitReveal,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Storage => "storage",
            Self::ModuleRegistry => "module_registry",
            Self::AccessControl => "access_control",
            Self::PhaseMachine => "phase_machine",
            Self::CommitReveal => "commit_reveal",
        };
        f.write_str(name)
    }
}

/// Notification body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// A slot changed.
    SlotChange {
        /// Raw namespace bytes.
        namespace: Vec<u8>,
        /// Raw key bytes.
        key: Vec<u8>,
        /// Value before the change (None if the slot was absent or deleted).
        old_value: Option<Vec<u8>>,
        /// Value after the change (None for deletes).
        new_value: Option<Vec<u8>>,
    },
    /// Component-specific attributes.
    Fields(BTreeMap<&'static str, String>),
}

/// A structured audit record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeNotification {
    /// Emitting component.
    pub component: Component,
    /// Event name (`slot_written`, `module_activated`, ...).
    pub event_kind: &'static str,
    /// Event body.
    pub payload: NotificationPayload,
}

impl ChangeNotification {
    /// Builds a notification with attribute fields.
    #[must_use]
    pub fn fields<I>(component: Component, event_kind: &'static str, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        Self {
            component,
            event_kind,
            payload: NotificationPayload::Fields(fields.into_iter().collect()),
        }
    }

    /// Looks up an attribute on a `Fields` payload.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match &self.payload {
            NotificationPayload::Fields(fields) => fields.get(name).map(String::as_str),
            NotificationPayload::SlotChange { .. } => None,
        }
    }
}

/// Receives change notifications.
pub trait ChangeSink: Send + Sync {
    /// Delivers one notification. Must not fail the caller.
    fn publish(&self, notification: ChangeNotification);
}

/// Discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn publish(&self, _notification: ChangeNotification) {}
}
