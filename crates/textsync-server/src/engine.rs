//! The document synchronization engine.
//!
//! One [`SyncEngine`] exists per server process. It owns the shared
//! [`Document`], the [`ObserverRegistry`] and the [`Broadcaster`], and is
//! handed to every request handler and connection task as an
//! `Arc<SyncEngine>`.
//!
//! Accepting an operation is one critical section on the document lock:
//! validate, encode the broadcast payload, commit, fan out. Encoding before
//! the commit means a payload that cannot be built leaves the document
//! untouched; fanning out before the lock is released means every observer
//! sees operations in the order they were accepted.

use crate::broadcast::{Broadcaster, FanoutReport, Payload};
use crate::error::{Result, ServerError};
use crate::observer::{Observer, ObserverId, ObserverRegistry};
use std::sync::Arc;
use textsync_core::{Document, Operation};
use tracing::{debug, info};

type Encoder = fn(&Operation) -> serde_json::Result<Payload>;

/// An operation that was applied and broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accepted {
    /// Full document text right after this operation.
    pub text: String,
    /// Revision the operation produced.
    pub revision: u64,
    pub fanout: FanoutReport,
}

/// Owns the shared document and everyone watching it.
pub struct SyncEngine {
    document: Document,
    broadcaster: Broadcaster,
    encode: Encoder,
}

impl SyncEngine {
    /// An engine over an empty document with no observers.
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            broadcaster: Broadcaster::new(Arc::new(ObserverRegistry::new())),
            encode: Payload::encode,
        }
    }

    /// Validate, apply and broadcast `op`.
    ///
    /// Validation and encoding failures are returned to the caller and
    /// leave the document unchanged. Delivery failures only prune observers.
    pub fn submit(&self, op: &Operation) -> Result<Accepted> {
        let mut doc = self.document.lock();

        let staged = doc.stage(op).inspect_err(|error| {
            debug!(origin = %op.origin_id, %error, "rejected operation");
        })?;
        let payload = (self.encode)(op).map_err(|e| ServerError::Serialization(e.to_string()))?;

        let revision = doc.commit(staged)?;
        let fanout = self.broadcaster.broadcast(&payload);
        let text = doc.text().to_owned();
        drop(doc);

        debug!(
            origin = %op.origin_id,
            revision,
            delivered = fanout.delivered,
            pruned = fanout.pruned,
            "accepted operation"
        );

        Ok(Accepted {
            text,
            revision,
            fanout,
        })
    }

    /// A snapshot of the current document text.
    pub fn current_text(&self) -> String {
        self.document.current_text()
    }

    pub fn revision(&self) -> u64 {
        self.document.revision()
    }

    /// Start delivering accepted operations to `observer`.
    pub fn register(&self, observer: Arc<dyn Observer>) {
        let id = observer.id();
        if self.registry().register(observer) {
            info!(observer = %id, observers = self.registry().len(), "observer registered");
        }
    }

    /// Stop delivering to `id`. Does nothing if it was already pruned.
    pub fn unregister(&self, id: ObserverId) {
        if self.registry().unregister(id).is_some() {
            info!(observer = %id, observers = self.registry().len(), "observer unregistered");
        }
    }

    pub fn registry(&self) -> &Arc<ObserverRegistry> {
        self.broadcaster.registry()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    #[cfg(test)]
    fn with_encoder(mut self, encode: Encoder) -> Self {
        self.encode = encode;
        self
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}
