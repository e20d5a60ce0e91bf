//! Transfer session endpoints: token issuance and status.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::AppState;

/// Uniform response envelope for the transfer API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    pub success: bool,
    pub message: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl TransferResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// Hand out a fresh connection token for a new transfer session.
///
/// The token is the only thing correlating a sender and a receiver;
/// nothing is stored server-side until a peer handshakes with it.
pub async fn init_transfer_handler(State(state): State<AppState>) -> impl IntoResponse {
    let connection_id = Uuid::new_v4().to_string();
    state.metrics.token_issued();
    info!(token = %connection_id, "transfer session initialized");

    Json(
        TransferResponse::success("Transfer session initialized")
            .with_data("connectionId", connection_id),
    )
}

/// Report pairing and queue state for a token.
pub async fn transfer_status_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Response {
    match state.relay.status(&token).await {
        Some(status) => Json(
            TransferResponse::success("Transfer session active")
                .with_data("senderConnected", status.sender_attached)
                .with_data("receiverConnected", status.receiver_attached)
                .with_data("queuedChunks", status.queued_chunks)
                .with_data("pendingMetadata", status.has_pending_metadata),
        )
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(TransferResponse::error("No transfer session for token")),
        )
            .into_response(),
    }
}
