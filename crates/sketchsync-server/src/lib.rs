//! SketchSync relay server.
//!
//! Hosts the Session Broadcast Core: per-room stroke logs with
//! server-assigned sequence numbers, fan-out to connected peers over
//! WebSocket, and full-log resync for late joiners.

pub mod relay;
pub mod room;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::room::AppState;

/// Build the relay router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(relay::ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> &'static str {
    "SketchSync relay server - connect via WebSocket at /ws"
}

async fn health() -> &'static str {
    "ok"
}
