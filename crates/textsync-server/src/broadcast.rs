//! Fan-out of accepted operations to every registered observer.
//!
//! The [`Broadcaster`] encodes nothing itself: the engine encodes the
//! operation once into a [`Payload`] before committing it, and the
//! broadcaster hands that same payload to each observer in a registry
//! snapshot. An observer that fails delivery is closed and removed from the
//! registry; the others are unaffected and the submitter never hears about it.

use crate::observer::ObserverRegistry;
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use textsync_core::Operation;
use tracing::warn;

/// One encoded operation, shared by every observer it is delivered to.
///
/// Cloning only bumps a reference count, and so does turning it into a
/// WebSocket text frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload(Utf8Bytes);

impl Payload {
    /// Encode `op` in its wire form.
    pub fn encode(op: &Operation) -> serde_json::Result<Self> {
        op.encode().map(|json| Self(json.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The payload as WebSocket frame text, sharing the encoded buffer.
    pub fn frame_text(&self) -> Utf8Bytes {
        self.0.clone()
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self(s.to_owned().into())
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Observers the payload was handed to.
    pub delivered: usize,
    /// Observers dropped because delivery failed.
    pub pruned: usize,
}

/// Delivers payloads to the observers of one registry.
pub struct Broadcaster {
    registry: Arc<ObserverRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ObserverRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ObserverRegistry> {
        &self.registry
    }

    /// Deliver `payload` to every observer currently registered.
    pub fn broadcast(&self, payload: &Payload) -> FanoutReport {
        let mut report = FanoutReport::default();

        for observer in self.registry.snapshot() {
            match observer.deliver(payload) {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    let id = observer.id();
                    warn!(observer = %id, %error, "dropping observer after failed delivery");
                    observer.close();
                    self.registry.unregister(id);
                    report.pruned += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{ChannelObserver, DeliveryError, Observer, ObserverId};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// An observer whose connection is already broken.
    struct BrokenObserver {
        id: ObserverId,
        closed: AtomicBool,
    }

    impl BrokenObserver {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: ObserverId::new(),
                closed: AtomicBool::new(false),
            })
        }
    }

    impl Observer for BrokenObserver {
        fn id(&self) -> ObserverId {
            self.id
        }

        fn deliver(&self, _payload: &Payload) -> Result<(), DeliveryError> {
            Err(DeliveryError::Disconnected)
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_payload_encodes_wire_form() {
        let payload = Payload::encode(&Operation::insert(0, "a").with_origin("c1")).unwrap();
        let value: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
        assert_eq!(value["type"], "insert");
        assert_eq!(value["clientId"], "c1");
    }

    #[test]
    fn test_delivered_payload_shares_encoded_buffer() {
        let registry = Arc::new(ObserverRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());
        let (first, mut first_outbox) = ChannelObserver::new(4);
        let (second, mut second_outbox) = ChannelObserver::new(4);
        registry.register(first);
        registry.register(second);

        let payload = Payload::encode(&Operation::insert(0, "shared")).unwrap();
        assert_eq!(broadcaster.broadcast(&payload).delivered, 2);

        let encoded = payload.as_str().as_ptr();
        for outbox in [&mut first_outbox, &mut second_outbox] {
            let received = tokio_test::block_on(outbox.next()).unwrap();
            assert_eq!(received.frame_text().as_str().as_ptr(), encoded);
        }
    }

    #[test]
    fn test_broadcast_with_no_observers() {
        let broadcaster = Broadcaster::new(Arc::new(ObserverRegistry::new()));
        assert_eq!(
            broadcaster.broadcast(&Payload::from("{}")),
            FanoutReport::default()
        );
    }

    #[test]
    fn test_failed_delivery_prunes_only_that_observer() {
        let registry = Arc::new(ObserverRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        let broken = BrokenObserver::new();
        let (healthy, mut outbox) = ChannelObserver::new(8);
        registry.register(broken.clone());
        registry.register(healthy.clone());

        let report = broadcaster.broadcast(&Payload::from("first"));
        assert_eq!(report, FanoutReport { delivered: 1, pruned: 1 });
        assert!(broken.closed.load(Ordering::SeqCst));
        assert!(!registry.contains(broken.id()));
        assert!(registry.contains(healthy.id()));

        let report = broadcaster.broadcast(&Payload::from("second"));
        assert_eq!(report, FanoutReport { delivered: 1, pruned: 0 });

        let first = tokio_test::block_on(outbox.next()).unwrap();
        let second = tokio_test::block_on(outbox.next()).unwrap();
        assert_eq!(first.as_str(), "first");
        assert_eq!(second.as_str(), "second");
    }

    #[test]
    fn test_lagging_observer_is_pruned() {
        let registry = Arc::new(ObserverRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());
        let (slow, _outbox) = ChannelObserver::new(1);
        registry.register(slow.clone());

        assert_eq!(broadcaster.broadcast(&Payload::from("a")).delivered, 1);
        assert_eq!(broadcaster.broadcast(&Payload::from("b")).pruned, 1);
        assert!(registry.is_empty());
    }
}
