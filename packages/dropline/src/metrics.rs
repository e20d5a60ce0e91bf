//! Server metrics for observability
//!
//! Runtime counters for monitoring relay health. Recovered errors
//! (deferred chunks, dropped frames) are counted too, not just terminal
//! ones.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server-wide metrics
#[derive(Debug, Default)]
pub struct RelayMetrics {
    // Connection metrics
    /// Currently active WebSocket connections
    pub active_connections: AtomicU64,
    /// Total connections since server start
    pub total_connections: AtomicU64,

    // Pairing metrics
    /// Transfer tokens handed out over HTTP
    pub tokens_issued: AtomicU64,
    /// Handshake frames accepted
    pub handshakes: AtomicU64,
    /// Pairings where both roles became attached
    pub pairings_completed: AtomicU64,

    // Frame metrics
    /// Chunks delivered to the addressed peer
    pub chunks_forwarded: AtomicU64,
    /// Chunks deferred into a record's queue
    pub chunks_queued: AtomicU64,
    /// Metadata frames delivered to the addressed peer
    pub metadata_forwarded: AtomicU64,
    /// Metadata frames deferred (latest-wins)
    pub metadata_queued: AtomicU64,
    /// Frames that arrived with no live session to route into
    pub frames_dropped: AtomicU64,

    // Error metrics
    /// Messages that failed classification (connection closed as bad data)
    pub classification_failures: AtomicU64,

    /// Server start time (for uptime calculation)
    start_time: Option<Instant>,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    // Connection tracking
    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    // Pairing tracking
    pub fn token_issued(&self) {
        self.tokens_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handshake(&self) {
        self.handshakes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pairing_completed(&self) {
        self.pairings_completed.fetch_add(1, Ordering::Relaxed);
    }

    // Frame tracking
    pub fn chunk_forwarded(&self) {
        self.chunks_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn chunk_queued(&self) {
        self.chunks_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn metadata_forwarded(&self) {
        self.metadata_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn metadata_queued(&self) {
        self.metadata_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // Error tracking
    pub fn classification_failure(&self) {
        self.classification_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    /// Create a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            connections: ConnectionMetrics {
                active: self.active_connections.load(Ordering::Relaxed),
                total: self.total_connections.load(Ordering::Relaxed),
            },
            pairings: PairingMetrics {
                tokens_issued: self.tokens_issued.load(Ordering::Relaxed),
                handshakes: self.handshakes.load(Ordering::Relaxed),
                completed: self.pairings_completed.load(Ordering::Relaxed),
            },
            frames: FrameMetrics {
                chunks_forwarded: self.chunks_forwarded.load(Ordering::Relaxed),
                chunks_queued: self.chunks_queued.load(Ordering::Relaxed),
                metadata_forwarded: self.metadata_forwarded.load(Ordering::Relaxed),
                metadata_queued: self.metadata_queued.load(Ordering::Relaxed),
                dropped: self.frames_dropped.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                classification: self.classification_failures.load(Ordering::Relaxed),
            },
        }
    }
}

/// Serializable snapshot of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections: ConnectionMetrics,
    pub pairings: PairingMetrics,
    pub frames: FrameMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    pub active: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingMetrics {
    pub tokens_issued: u64,
    pub handshakes: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMetrics {
    pub chunks_forwarded: u64,
    pub chunks_queued: u64,
    pub metadata_forwarded: u64,
    pub metadata_queued: u64,
    pub dropped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub classification: u64,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub active_transfers: u64,
    pub connections: u64,
    pub uptime_secs: u64,
}
