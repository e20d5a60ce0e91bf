//! Transfer socket loop
//!
//! One task per WebSocket connection reads and classifies inbound
//! frames; a writer task drains the connection's outbound frame channel
//! to the wire in FIFO order. The relay only ever sees [`PeerHandle`]s
//! backed by that channel, so everything it forwards to this connection
//! is serialized through one place.

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::FutureExt;
use futures::{sink::SinkExt, stream::SplitSink, stream::StreamExt};
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use transfer_relay::{
    Frame, OutboundFrame, PeerHandle, RelayOutcome, Role, TransportKind, classify_binary,
    classify_text,
};

use crate::AppState;

/// Token and role this connection bound itself to via its handshake.
struct PeerBinding {
    token: String,
    role: Role,
}

/// Why the server is closing the connection.
enum CloseReason {
    /// Classification or decoding failure on this connection's input.
    BadData(String),
    /// Unexpected internal fault while handling this connection's input.
    ServerError(String),
}

impl CloseReason {
    fn frame(&self) -> CloseFrame {
        match self {
            CloseReason::BadData(reason) => CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: reason.clone().into(),
            },
            CloseReason::ServerError(reason) => CloseFrame {
                code: close_code::ERROR,
                reason: reason.clone().into(),
            },
        }
    }
}

/// Handle one transfer WebSocket connection for its whole lifetime.
pub async fn handle_transfer_socket(socket: WebSocket, state: AppState, transport: TransportKind) {
    let connection_id = Uuid::new_v4().to_string();
    debug!(%connection_id, ?transport, "transfer socket connected");
    state.metrics.connection_opened();

    let (ws_sender, mut ws_receiver) = socket.split();
    let capacity = state.server_config.websocket.send_channel_capacity;
    let (tx, rx) = mpsc::channel::<OutboundFrame>(capacity);

    // Writer task: owns the sink until the outbound channel closes, then
    // hands it back for the close handshake.
    let writer = tokio::spawn(write_outbound(ws_sender, rx));

    let mut binding: Option<PeerBinding> = None;
    let mut close: Option<CloseReason> = None;

    while let Some(message) = ws_receiver.next().await {
        let message = match message {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%connection_id, error = %e, "websocket error, dropping connection");
                break;
            }
        };

        let frame = match message {
            Message::Text(text) => match classify_text(&text) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(%connection_id, error = %e, "failed to classify text frame");
                    state.metrics.classification_failure();
                    close = Some(CloseReason::BadData(e.to_string()));
                    break;
                }
            },
            Message::Binary(data) => classify_binary(data.to_vec()),
            Message::Close(_) => {
                debug!(%connection_id, "client closed connection");
                break;
            }
            _ => continue,
        };

        // A panic out of relay dispatch is terminal for this connection
        // only; shared records stay consistent because every mutation
        // completes under the record lock.
        let handled = AssertUnwindSafe(handle_frame(
            &state,
            &connection_id,
            transport,
            &tx,
            &mut binding,
            frame,
        ))
        .catch_unwind()
        .await;

        if handled.is_err() {
            error!(%connection_id, "unexpected fault while relaying frame");
            close = Some(CloseReason::ServerError("server error".to_string()));
            break;
        }
    }

    // Detach before dropping our sender: the registry holds a clone of
    // it, and the writer only finishes once every sender is gone.
    if let Some(bound) = &binding {
        state
            .relay
            .detach(&bound.token, bound.role, &connection_id)
            .await;
        info!(%connection_id, token = %bound.token, role = %bound.role, "peer disconnected");
    }
    drop(tx);

    match writer.await {
        Ok(mut ws_sender) => {
            if let Some(reason) = close {
                let _ = ws_sender.send(Message::Close(Some(reason.frame()))).await;
            }
        }
        Err(e) => error!(%connection_id, error = %e, "writer task failed"),
    }

    state.metrics.connection_closed();
    debug!(%connection_id, "transfer socket closed");
}

/// Drain outbound frames to the wire in FIFO order.
async fn write_outbound(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<OutboundFrame>,
) -> SplitSink<WebSocket, Message> {
    while let Some(frame) = rx.recv().await {
        let message = match frame {
            OutboundFrame::Text(text) => Message::Text(text.into()),
            OutboundFrame::Binary(bytes) => Message::Binary(bytes.into()),
        };
        if ws_sender.send(message).await.is_err() {
            break;
        }
    }
    ws_sender
}

/// Route one classified frame into the relay.
async fn handle_frame(
    state: &AppState,
    connection_id: &str,
    transport: TransportKind,
    tx: &mpsc::Sender<OutboundFrame>,
    binding: &mut Option<PeerBinding>,
    frame: Frame,
) {
    match frame {
        Frame::Handshake(handshake) => {
            // A re-handshake rebinds this socket; release the old role
            // first so its slot does not leak.
            if let Some(prev) = binding.take() {
                if prev.token != handshake.id || prev.role != handshake.role {
                    state
                        .relay
                        .detach(&prev.token, prev.role, connection_id)
                        .await;
                }
            }

            let peer = PeerHandle::new(connection_id, transport, tx.clone());
            let outcome = state.relay.attach(&handshake.id, handshake.role, peer).await;
            state.metrics.handshake();
            if outcome.paired {
                state.metrics.pairing_completed();
            }
            info!(%connection_id, token = %handshake.id, role = %handshake.role, "peer connected");
            *binding = Some(PeerBinding {
                token: handshake.id,
                role: handshake.role,
            });
        }
        Frame::Metadata(metadata) => {
            let Some(bound) = binding.as_ref() else {
                warn!(%connection_id, "metadata frame before handshake, dropping");
                state.metrics.frame_dropped();
                return;
            };
            match state
                .relay
                .relay_metadata(&bound.token, bound.role, metadata)
                .await
            {
                RelayOutcome::Forwarded => state.metrics.metadata_forwarded(),
                RelayOutcome::Queued => state.metrics.metadata_queued(),
                RelayOutcome::NoSession => state.metrics.frame_dropped(),
            }
        }
        Frame::Chunk(data) => {
            let Some(bound) = binding.as_ref() else {
                warn!(%connection_id, "chunk before handshake, dropping");
                state.metrics.frame_dropped();
                return;
            };
            match state.relay.relay_chunk(&bound.token, bound.role, data).await {
                RelayOutcome::Forwarded => state.metrics.chunk_forwarded(),
                RelayOutcome::Queued => state.metrics.chunk_queued(),
                RelayOutcome::NoSession => state.metrics.frame_dropped(),
            }
        }
        Frame::Ignored => {
            debug!(%connection_id, "ignoring stringified buffer artifact");
        }
    }
}
