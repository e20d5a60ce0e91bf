//! Pairing relay: the per-token event state machine.
//!
//! Every event (handshake, metadata, chunk, disconnect) resolves the
//! token's record and mutates it under the record's mutex. That single
//! lock is also the per-record writer discipline: direct forwards and
//! queue flushes cannot interleave, so bytes reach a peer's channel in
//! arrival order.

use tracing::{debug, error, info, warn};

use crate::codec;
use crate::frame::FileMetadata;
use crate::peer::{OutboundFrame, PeerHandle, Role};
use crate::registry::{AttachOutcome, PairingRecord, QueuedChunk, RecordStatus, TransferRegistry};

/// What happened to a relayed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Delivered to the addressed peer.
    Forwarded,
    /// Held in the record's queue for a later flush.
    Queued,
    /// No record for this token; the frame was dropped.
    NoSession,
}

pub struct TransferRelay {
    registry: TransferRegistry,
}

impl Default for TransferRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferRelay {
    pub fn new() -> Self {
        Self {
            registry: TransferRegistry::new(),
        }
    }

    /// Handshake event: install the peer for its role and flush anything
    /// already queued that it can now take.
    pub async fn attach(&self, token: &str, role: Role, peer: PeerHandle) -> AttachOutcome {
        let connection_id = peer.connection_id().to_string();
        let (record, outcome) = self.registry.attach(token, role, peer).await;

        if outcome.replaced {
            debug!(token, role = %role, %connection_id, "replaced existing connection for role");
        }
        if outcome.paired {
            info!(token, role = %role, "pairing complete");
        }

        let mut rec = record.lock().await;
        Self::flush(&mut rec);
        outcome
    }

    /// Disconnect event. Queued chunks and metadata survive so whichever
    /// side reconnects next can resume the backlog.
    pub async fn detach(&self, token: &str, role: Role, connection_id: &str) {
        self.registry.detach(token, role, connection_id).await;
    }

    /// Metadata event from `from`, addressed to the opposite role.
    /// Undeliverable metadata is kept latest-wins: a newer frame
    /// supersedes any not-yet-delivered one, unlike chunks, which are
    /// never dropped.
    pub async fn relay_metadata(
        &self,
        token: &str,
        from: Role,
        metadata: FileMetadata,
    ) -> RelayOutcome {
        let Some(record) = self.registry.get(token).await else {
            warn!(token, "no transfer session for metadata frame");
            return RelayOutcome::NoSession;
        };

        let mut rec = record.lock().await;
        rec.pending_metadata = Some((from.opposite(), metadata));
        Self::flush(&mut rec);

        if rec.pending_metadata.is_none() {
            RelayOutcome::Forwarded
        } else {
            debug!(token, target = %from.opposite(), "metadata deferred");
            RelayOutcome::Queued
        }
    }

    /// Chunk event from `from`, addressed to the opposite role. The
    /// chunk always enters the queue and the queue is drained while the
    /// front chunk's target is deliverable, so a new chunk can never
    /// overtake one that arrived before it.
    pub async fn relay_chunk(&self, token: &str, from: Role, data: Vec<u8>) -> RelayOutcome {
        let Some(record) = self.registry.get(token).await else {
            warn!(token, "no transfer session for chunk");
            return RelayOutcome::NoSession;
        };

        let mut rec = record.lock().await;
        rec.pending_chunks.push_back(QueuedChunk {
            target: from.opposite(),
            data,
        });
        Self::flush(&mut rec);

        if rec.pending_chunks.is_empty() {
            RelayOutcome::Forwarded
        } else {
            debug!(
                token,
                target = %from.opposite(),
                backlog = rec.pending_chunks.len(),
                "chunk deferred"
            );
            RelayOutcome::Queued
        }
    }

    /// Status snapshot for a token, if it has a live record.
    pub async fn status(&self, token: &str) -> Option<RecordStatus> {
        self.registry.status(token).await
    }

    /// Number of live pairing records.
    pub async fn active_records(&self) -> usize {
        self.registry.len().await
    }

    /// Drain pending metadata first, then queued chunks front-to-back.
    /// Stops at the first failed or undeliverable send, leaving the
    /// failed item in place; retry is event-driven (next chunk, next
    /// attach), never a busy loop.
    fn flush(rec: &mut PairingRecord) {
        if let Some((target, metadata)) = rec.pending_metadata.take() {
            match Self::live_handle(rec, target).cloned() {
                Some(peer) => {
                    match serde_json::to_string(&metadata) {
                        Ok(text) => {
                            if let Err(e) = peer.try_send(OutboundFrame::Text(text)) {
                                debug!(target = %target, error = %e, "metadata send failed, keeping pending");
                                rec.pending_metadata = Some((target, metadata));
                                return;
                            }
                        }
                        // Unreachable for a plain struct; never wedge the
                        // queue behind it.
                        Err(e) => error!(error = %e, "failed to serialize metadata frame"),
                    }
                }
                None => rec.pending_metadata = Some((target, metadata)),
            }
        }

        loop {
            let (peer, frame) = {
                let Some(front) = rec.pending_chunks.front() else {
                    break;
                };
                let Some(peer) = Self::live_handle(rec, front.target) else {
                    break;
                };
                (peer.clone(), codec::encode_chunk(&front.data, peer.transport()))
            };

            match peer.try_send(frame) {
                Ok(()) => {
                    rec.pending_chunks.pop_front();
                }
                Err(e) => {
                    debug!(error = %e, "chunk send failed, halting flush");
                    break;
                }
            }
        }
    }

    fn live_handle(rec: &PairingRecord, role: Role) -> Option<&PeerHandle> {
        rec.slot(role).filter(|peer| peer.is_open())
    }
}
