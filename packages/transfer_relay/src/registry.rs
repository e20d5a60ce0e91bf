//! Connection registry: the shared table of pairing records.
//!
//! Lock order is always map then record. `attach` and `detach` take the
//! record lock while still holding the map write guard, so slot
//! installation, stale-detach checks, and empty-record removal cannot
//! interleave with each other.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::frame::FileMetadata;
use crate::peer::{PeerHandle, Role};

/// A chunk waiting for its addressed role to come (back) online.
#[derive(Clone, Debug)]
pub(crate) struct QueuedChunk {
    pub target: Role,
    pub data: Vec<u8>,
}

/// Pairing state for one connection token.
#[derive(Default)]
pub struct PairingRecord {
    sender: Option<PeerHandle>,
    receiver: Option<PeerHandle>,
    /// Deferred chunks in strict arrival order. A chunk leaves the queue
    /// only once it has been handed to its addressed peer.
    pub(crate) pending_chunks: VecDeque<QueuedChunk>,
    /// Latest undelivered metadata frame; a newer one supersedes it.
    pub(crate) pending_metadata: Option<(Role, FileMetadata)>,
}

impl PairingRecord {
    pub(crate) fn slot(&self, role: Role) -> Option<&PeerHandle> {
        match role {
            Role::Sender => self.sender.as_ref(),
            Role::Receiver => self.receiver.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, role: Role) -> &mut Option<PeerHandle> {
        match role {
            Role::Sender => &mut self.sender,
            Role::Receiver => &mut self.receiver,
        }
    }

    fn is_empty(&self) -> bool {
        self.sender.is_none() && self.receiver.is_none()
    }

    fn status(&self) -> RecordStatus {
        RecordStatus {
            sender_attached: self.sender.is_some(),
            receiver_attached: self.receiver.is_some(),
            queued_chunks: self.pending_chunks.len(),
            has_pending_metadata: self.pending_metadata.is_some(),
        }
    }
}

/// Point-in-time view of a record, for status reporting.
#[derive(Clone, Debug, Serialize)]
pub struct RecordStatus {
    pub sender_attached: bool,
    pub receiver_attached: bool,
    pub queued_chunks: usize,
    pub has_pending_metadata: bool,
}

/// Result of installing a handle into a record.
#[derive(Clone, Copy, Debug)]
pub struct AttachOutcome {
    /// Both roles now hold connections.
    pub paired: bool,
    /// A previous connection held this role and was replaced.
    pub replaced: bool,
}

pub(crate) type SharedRecord = Arc<Mutex<PairingRecord>>;

/// Table of live pairing records keyed by connection token.
///
/// A record exists from the first handshake that references its token
/// until both role slots are empty again; removal is part of `detach`.
#[derive(Default)]
pub struct TransferRegistry {
    records: RwLock<HashMap<String, SharedRecord>>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `peer` into `role` for `token`, creating the record if
    /// absent. An existing handle for the role is replaced (reconnection
    /// semantics); queued data is untouched.
    pub(crate) async fn attach(
        &self,
        token: &str,
        role: Role,
        peer: PeerHandle,
    ) -> (SharedRecord, AttachOutcome) {
        let mut map = self.records.write().await;
        let record = map.entry(token.to_string()).or_default().clone();
        let mut rec = record.lock().await;
        drop(map);

        let replaced = rec.slot_mut(role).replace(peer).is_some();
        let paired = rec.slot(role.opposite()).is_some();
        drop(rec);

        (record, AttachOutcome { paired, replaced })
    }

    /// Clear `role` if `connection_id` still owns it, then drop the
    /// record once both slots are empty. A stale detach from an
    /// already-replaced connection is a no-op, so a late disconnect
    /// cannot clobber a newer connection.
    pub(crate) async fn detach(&self, token: &str, role: Role, connection_id: &str) {
        let mut map = self.records.write().await;
        let Some(record) = map.get(token).cloned() else {
            return;
        };
        let mut rec = record.lock().await;

        let owns_slot =
            matches!(rec.slot(role), Some(peer) if peer.connection_id() == connection_id);
        if !owns_slot {
            return;
        }
        *rec.slot_mut(role) = None;
        debug!(token, role = %role, connection_id, "peer detached");

        if rec.is_empty() {
            map.remove(token);
            debug!(token, "pairing record dropped");
        }
    }

    /// Lookup only, no mutation.
    pub(crate) async fn get(&self, token: &str) -> Option<SharedRecord> {
        self.records.read().await.get(token).cloned()
    }

    /// Status snapshot for a token, if it has a live record.
    pub async fn status(&self, token: &str) -> Option<RecordStatus> {
        let record = self.get(token).await?;
        let rec = record.lock().await;
        Some(rec.status())
    }

    /// Number of live pairing records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{OutboundFrame, TransportKind};
    use tokio::sync::mpsc;

    fn peer(id: &str) -> (PeerHandle, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(8);
        (PeerHandle::new(id, TransportKind::Native, tx), rx)
    }

    #[tokio::test]
    async fn attach_creates_record_lazily() {
        let registry = TransferRegistry::new();
        assert_eq!(registry.len().await, 0);

        let (sender, _rx) = peer("c1");
        let (_, outcome) = registry.attach("t1", Role::Sender, sender).await;
        assert!(!outcome.paired);
        assert!(!outcome.replaced);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn second_role_completes_pairing() {
        let registry = TransferRegistry::new();
        let (sender, _srx) = peer("c1");
        let (receiver, _rrx) = peer("c2");

        registry.attach("t1", Role::Sender, sender).await;
        let (_, outcome) = registry.attach("t1", Role::Receiver, receiver).await;
        assert!(outcome.paired);
        assert!(!outcome.replaced);
    }

    #[tokio::test]
    async fn reattach_replaces_handle() {
        let registry = TransferRegistry::new();
        let (first, _rx1) = peer("c1");
        let (second, _rx2) = peer("c2");

        registry.attach("t1", Role::Sender, first).await;
        let (record, outcome) = registry.attach("t1", Role::Sender, second).await;
        assert!(outcome.replaced);

        let rec = record.lock().await;
        assert_eq!(rec.slot(Role::Sender).unwrap().connection_id(), "c2");
    }

    #[tokio::test]
    async fn stale_detach_is_a_no_op() {
        let registry = TransferRegistry::new();
        let (first, _rx1) = peer("c1");
        let (second, _rx2) = peer("c2");

        registry.attach("t1", Role::Sender, first).await;
        registry.attach("t1", Role::Sender, second).await;

        // The replaced connection's disconnect arrives late.
        registry.detach("t1", Role::Sender, "c1").await;

        let status = registry.status("t1").await.unwrap();
        assert!(status.sender_attached);
    }

    #[tokio::test]
    async fn record_removed_when_both_slots_empty() {
        let registry = TransferRegistry::new();
        let (sender, _srx) = peer("c1");
        let (receiver, _rrx) = peer("c2");

        registry.attach("t1", Role::Sender, sender).await;
        registry.attach("t1", Role::Receiver, receiver).await;

        registry.detach("t1", Role::Sender, "c1").await;
        assert_eq!(registry.len().await, 1);

        registry.detach("t1", Role::Receiver, "c2").await;
        assert_eq!(registry.len().await, 0);

        // Idempotent on an unknown token.
        registry.detach("t1", Role::Receiver, "c2").await;
    }

    #[tokio::test]
    async fn detach_keeps_queue_for_remaining_peer() {
        let registry = TransferRegistry::new();
        let (sender, _srx) = peer("c1");
        let (record, _) = registry.attach("t1", Role::Sender, sender).await;

        record.lock().await.pending_chunks.push_back(QueuedChunk {
            target: Role::Receiver,
            data: vec![1],
        });

        let (receiver, _rrx) = peer("c2");
        registry.attach("t1", Role::Receiver, receiver).await;
        registry.detach("t1", Role::Sender, "c1").await;

        let status = registry.status("t1").await.unwrap();
        assert!(!status.sender_attached);
        assert_eq!(status.queued_chunks, 1);
    }
}
