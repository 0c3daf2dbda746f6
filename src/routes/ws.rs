//! Channel (WebSocket) router.

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::handlers::ws;
use crate::state::AppState;

/// Create the channel router exposing the bidirectional event endpoint.
pub fn create_channel_router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws::channel_handler))
}
