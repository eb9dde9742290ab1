use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::AppState;
use crate::hub;

/// Upgrade to the hub channel: the connection joins the broadcast set and
/// receives the full history before any live traffic.
pub async fn websocket_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.hub.clone();
    let store = state.blob_store.clone();
    let metrics = state.metrics.clone();

    ws.on_upgrade(move |socket| hub::run_session(socket, hub, store, metrics))
}
