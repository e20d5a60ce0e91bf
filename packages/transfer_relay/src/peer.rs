//! Peer connection handles and the roles they play in a pairing.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SendError;

/// The two ends of a pairing.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    /// The role frames from this side are addressed to.
    pub fn opposite(self) -> Role {
        match self {
            Role::Sender => Role::Receiver,
            Role::Receiver => Role::Sender,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a peer's channel carries binary data.
///
/// Fixed once at connection-accept time and carried on the handle;
/// never re-derived from connection metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    /// Channel supports raw binary frames.
    Native,
    /// Text-only channel; binary goes out as a base64 JSON envelope.
    Fallback,
}

/// A frame on its way out to a peer connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Writable reference to a live peer connection.
///
/// The owning connection's writer task holds the receiving end of the
/// channel and drains it to the wire in FIFO order. When the connection
/// closes the receiver is dropped, every later send fails, and the relay
/// treats the peer as gone.
#[derive(Clone, Debug)]
pub struct PeerHandle {
    connection_id: String,
    transport: TransportKind,
    tx: mpsc::Sender<OutboundFrame>,
}

impl PeerHandle {
    pub fn new(
        connection_id: impl Into<String>,
        transport: TransportKind,
        tx: mpsc::Sender<OutboundFrame>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            transport,
            tx,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Whether the owning connection is still draining this channel.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Non-blocking send. A full or closed channel is a send failure;
    /// the caller decides whether to requeue.
    pub fn try_send(&self, frame: OutboundFrame) -> Result<(), SendError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Backpressured,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }
}
