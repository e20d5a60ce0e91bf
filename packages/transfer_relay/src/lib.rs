//! Transfer Relay - token-pairing relay engine
//!
//! Pairs two peer connections (a sender and a receiver) by a shared
//! connection token and relays file metadata and binary payload chunks
//! between them in strict order. Each chunk is re-encoded for the
//! receiving peer's transport: raw binary frames for native channels,
//! base64 JSON envelopes for text-only fallback channels.
//!
//! The crate has no HTTP or WebSocket dependencies. A peer is reached
//! through a [`PeerHandle`], a bounded channel whose receiving end is
//! drained to the wire by the owning connection's writer task, so the
//! whole engine can be driven in-process from tests.
//!
//! # Example
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use transfer_relay::{PeerHandle, Role, TransferRelay, TransportKind};
//!
//! #[tokio::main]
//! async fn main() {
//!     let relay = TransferRelay::new();
//!
//!     // The receiver arrives first; its writer task owns `rx`.
//!     let (tx, mut rx) = mpsc::channel(32);
//!     let receiver = PeerHandle::new("conn-1", TransportKind::Native, tx);
//!     relay.attach("a1b2", Role::Receiver, receiver).await;
//!
//!     // A chunk from the sender side is forwarded immediately.
//!     relay.relay_chunk("a1b2", Role::Sender, vec![1, 2, 3]).await;
//!     let frame = rx.recv().await;
//!     println!("{frame:?}");
//! }
//! ```

mod codec;
mod error;
mod frame;
mod peer;
mod registry;
mod relay;

pub use codec::encode_chunk;
pub use error::{ClassifyError, SendError};
pub use frame::{Frame, FileMetadata, HandshakeFrame, classify_binary, classify_text};
pub use peer::{OutboundFrame, PeerHandle, Role, TransportKind};
pub use registry::{AttachOutcome, RecordStatus};
pub use relay::{RelayOutcome, TransferRelay};
