//! textsync server - keeps every participant's view of one shared document in sync
//!
//! Editors submit insert/delete operations over HTTP; the engine applies
//! them one at a time to the shared document and pushes each accepted
//! operation to every connected WebSocket observer.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use textsync_server::{ChannelObserver, Operation, SyncEngine};
//!
//! let engine = Arc::new(SyncEngine::new());
//!
//! // Observers get every accepted operation, in acceptance order
//! let (observer, _outbox) = ChannelObserver::new(16);
//! engine.register(observer);
//!
//! let accepted = engine.submit(&Operation::insert(0, "Hello")).unwrap();
//! assert_eq!(accepted.text, "Hello");
//! assert_eq!(accepted.fanout.delivered, 1);
//! ```
//!
//! # Architecture
//!
//! - [`engine`] - the single service object owning document and observers
//! - [`observer`] - observer handles and the registry
//! - [`broadcast`] - fan-out with pruning of failed observers
//! - [`http`] - axum routes for edits, reads and WebSocket observers
//! - [`config`] - server configuration
//! - [`error`] - error types

pub mod broadcast;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod observer;

// Re-exports for convenience
pub use broadcast::{Broadcaster, FanoutReport, Payload};
pub use config::{ServerConfig, ServerConfigBuilder};
pub use engine::{Accepted, SyncEngine};
pub use error::{Result, ServerError};
pub use http::{router, serve, serve_on, AppState};
pub use observer::{ChannelObserver, DeliveryError, Observer, ObserverId, ObserverRegistry, Outbox};

pub use textsync_core::{Document, Operation, OperationError, OperationKind};
