//! Observers and the registry of those currently eligible for broadcasts.

use crate::broadcast::Payload;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use ulid::Ulid;

/// Unique identifier for one observer connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(Ulid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a payload could not be handed to an observer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("observer disconnected")]
    Disconnected,

    #[error("observer is not keeping up ({capacity} payloads pending)")]
    Lagging { capacity: usize },
}

/// A party that receives every accepted operation.
///
/// `deliver` must not block: it is called with the document lock held.
pub trait Observer: Send + Sync + 'static {
    fn id(&self) -> ObserverId;

    /// Hand one encoded operation to the observer.
    fn deliver(&self, payload: &Payload) -> Result<(), DeliveryError>;

    /// Ask the observer's connection to shut down.
    fn close(&self);
}

/// An observer backed by a bounded queue, drained by its connection task.
pub struct ChannelObserver {
    id: ObserverId,
    capacity: usize,
    tx: mpsc::Sender<Payload>,
    shutdown: Arc<Notify>,
}

/// The receiving half of a [`ChannelObserver`].
pub struct Outbox {
    rx: mpsc::Receiver<Payload>,
    shutdown: Arc<Notify>,
}

impl ChannelObserver {
    /// Create an observer holding at most `capacity` undelivered payloads.
    pub fn new(capacity: usize) -> (Arc<Self>, Outbox) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let shutdown = Arc::new(Notify::new());
        let observer = Arc::new(Self {
            id: ObserverId::new(),
            capacity,
            tx,
            shutdown: shutdown.clone(),
        });
        (observer, Outbox { rx, shutdown })
    }
}

impl Observer for ChannelObserver {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn deliver(&self, payload: &Payload) -> Result<(), DeliveryError> {
        self.tx.try_send(payload.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Lagging {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }

    fn close(&self) {
        self.shutdown.notify_one();
    }
}

impl Outbox {
    /// Next payload to write, or `None` once the observer was closed or
    /// every sender is gone.
    pub async fn next(&mut self) -> Option<Payload> {
        tokio::select! {
            biased;
            _ = self.shutdown.notified() => None,
            payload = self.rx.recv() => payload,
        }
    }
}

/// The set of observers eligible for delivery.
///
/// Guarded by its own lock, independent of the document's. The lock is only
/// held to insert, remove or copy out handles, never while delivering.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<HashMap<ObserverId, Arc<dyn Observer>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Returns `false` if it was already registered.
    pub fn register(&self, observer: Arc<dyn Observer>) -> bool {
        let mut observers = self.observers.write();
        let id = observer.id();
        if observers.contains_key(&id) {
            return false;
        }
        observers.insert(id, observer);
        true
    }

    /// Remove an observer, returning it if it was present.
    pub fn unregister(&self, id: ObserverId) -> Option<Arc<dyn Observer>> {
        self.observers.write().remove(&id)
    }

    /// Copy out the current handles.
    pub fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.observers.read().values().cloned().collect()
    }

    pub fn contains(&self, id: ObserverId) -> bool {
        self.observers.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }
}
