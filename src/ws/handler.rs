//! Axum upgrade handler for the change-notification endpoint.

use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::StreamExt;

use super::delivery::DeliveryLoop;
use crate::server::AppState;

/// `GET /_/events`: upgrade and stream change notifications until either
/// side goes away.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    let ct = state.shutdown.child_token();

    let reason = DeliveryLoop::new(state.broadcaster.clone())
        .with_ping_interval(state.ping_interval)
        .run(sink, stream, ct)
        .await;

    crate::log_event!(
        "ws",
        "client disconnected",
        "{reason:?}, {} active",
        state.broadcaster.subscriber_count()
    );
}
