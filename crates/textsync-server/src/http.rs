//! HTTP and WebSocket surface.
//!
//! | Route        | Method | Behaviour |
//! |--------------|--------|-----------|
//! | `/`          | GET    | the configured index file |
//! | `/text`      | GET    | current document text |
//! | `/edit`      | POST   | submit one JSON operation, returns the new text |
//! | `/ws`        | GET    | WebSocket; one text frame per accepted operation |
//!
//! Handlers only decode, call the [`SyncEngine`] and map errors to status
//! codes; all invariants live in the engine.

use crate::config::ServerConfig;
use crate::engine::SyncEngine;
use crate::error::{Result, ServerError};
use crate::observer::{ChannelObserver, Observer};
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{Html, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use textsync_core::Operation;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub config: Arc<ServerConfig>,
}

/// Build the application router over `engine`.
pub fn router(engine: Arc<SyncEngine>, config: ServerConfig) -> Router {
    let state = AppState {
        engine,
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(handle_index))
        .route("/text", get(handle_get_text))
        .route("/edit", post(handle_edit))
        .route("/ws", get(handle_ws))
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until the process exits.
pub async fn serve(engine: Arc<SyncEngine>, config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    serve_on(listener, engine, config).await
}

/// Serve on an already bound listener.
pub async fn serve_on(
    listener: TcpListener,
    engine: Arc<SyncEngine>,
    config: ServerConfig,
) -> Result<()> {
    info!(addr = %listener.local_addr()?, "textsync listening");
    info!(
        coordination_addr = %config.coordination_addr,
        "coordination store configured but unused; running single-instance"
    );

    axum::serve(listener, router(engine, config)).await?;
    Ok(())
}

async fn handle_index(State(state): State<AppState>) -> Result<Html<Vec<u8>>> {
    let page = tokio::fs::read(&state.config.index_path).await?;
    Ok(Html(page))
}

async fn handle_get_text(State(state): State<AppState>) -> String {
    state.engine.current_text()
}

async fn handle_edit(State(state): State<AppState>, body: Bytes) -> Result<String> {
    let op = Operation::decode(&body).map_err(ServerError::Decode)?;
    let accepted = state.engine.submit(&op)?;
    Ok(accepted.text)
}

async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| observe(socket, state))
}

/// Drive one observer connection from registration to unregistration.
///
/// Inbound frames only tell us the peer is alive. The connection ends when
/// the peer closes, a read or write fails, or the broadcaster closes the
/// observer after a failed delivery.
async fn observe(socket: WebSocket, state: AppState) {
    let (observer, mut outbox) = ChannelObserver::new(state.config.observer_queue_capacity);
    let id = observer.id();
    state.engine.register(observer);

    let (mut sink, mut stream) = socket.split();

    let writer = async {
        while let Some(payload) = outbox.next().await {
            if sink.send(Message::Text(payload.frame_text())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    };

    let reader = async {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    tokio::select! {
        _ = writer => debug!(observer = %id, "observer writer finished"),
        _ = reader => debug!(observer = %id, "observer reader finished"),
    }

    state.engine.unregister(id);
}
