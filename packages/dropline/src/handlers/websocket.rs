use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use transfer_relay::TransportKind;

use crate::AppState;
use crate::socket;

/// Native transfer endpoint: the peer's channel carries raw binary
/// frames.
pub async fn native_websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        socket::handle_transfer_socket(socket, state, TransportKind::Native)
    })
}

/// Fallback transfer endpoint for text-only clients: chunks go out as
/// base64 JSON envelopes. The capability is fixed here, at accept time,
/// and carried on the peer handle.
pub async fn fallback_websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        socket::handle_transfer_socket(socket, state, TransportKind::Fallback)
    })
}
