//! Single-subscriber notification hub.
//!
//! Notifications carry no payload. A subscriber re-queries the executor for the current
//! status, histories or work queue snapshot after being told which of them changed.

use serde::Serialize;
use std::sync::mpsc::Sender;
use std::sync::{Arc, RwLock};

use tracing::debug;

/// Kind of state change being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    StatusUpdate,
    IterUpdate,
    WorkQueueUpdate,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Event::StatusUpdate => "status_update",
            Event::IterUpdate => "iter_update",
            Event::WorkQueueUpdate => "work_queue_update",
        };
        write!(f, "{name}")
    }
}

/// Receiver of executor notifications.
pub trait Observer: Send + Sync {
    fn notify(&self, event: Event);
}

impl<F> Observer for F
where
    F: Fn(Event) + Send + Sync,
{
    fn notify(&self, event: Event) {
        self(event)
    }
}

/// Channel-backed observer; a dropped receiver silently discards events.
pub struct ChannelObserver {
    sender: std::sync::Mutex<Sender<Event>>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<Event>) -> Self {
        Self {
            sender: std::sync::Mutex::new(sender),
        }
    }
}

impl Observer for ChannelObserver {
    fn notify(&self, event: Event) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if sender.send(event).is_err() {
            debug!(%event, "observer channel closed");
        }
    }
}

/// Holds at most one observer; registering a new one replaces the previous.
#[derive(Default)]
pub struct ObserverHub {
    observer: RwLock<Option<Arc<dyn Observer>>>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn Observer>) {
        let mut slot = self
            .observer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(observer);
    }

    pub fn unregister(&self) {
        let mut slot = self
            .observer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }

    pub fn notify(&self, event: Event) {
        // Clone out of the lock so an observer may re-register without deadlocking.
        let observer = self
            .observer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(observer) = observer {
            observer.notify(event);
        }
    }
}
