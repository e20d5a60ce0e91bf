/// Failure to classify an inbound message into a frame.
///
/// Terminal for the offending connection: the transport layer closes it
/// with a bad-data status carrying this reason. Registry state for the
/// token is left untouched so the peer may still reconnect.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifyError {
    #[error("invalid message format: {0}")]
    Malformed(String),

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// Failure to hand a frame to a peer's outbound channel.
///
/// Recovered locally by the relay's requeue policy; never closes the
/// connection that produced the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The peer's outbound channel is gone (connection closed).
    #[error("peer connection closed")]
    Closed,

    /// The peer's outbound channel is full.
    #[error("peer outbound queue full")]
    Backpressured,
}
