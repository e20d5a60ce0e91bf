//! Inbound message classification.
//!
//! Turns a raw text or binary message into a typed [`Frame`]. Text is
//! inspected structurally: parse to JSON first, branch on the `type`
//! discriminant, then deserialize into the typed shape.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::ClassifyError;
use crate::peer::Role;

/// Artifact of a misbehaving client: a binary buffer stringified into a
/// text frame. Recognized and dropped rather than treated as malformed.
const STRINGIFIED_BUFFER_MARKER: &str = "[object ArrayBuffer]";

/// Handshake announcing which pairing a connection belongs to.
///
/// Wire shape: `{"type":"connection","id":"<token>","role":"sender"}`.
#[derive(Clone, Debug, Deserialize)]
pub struct HandshakeFrame {
    /// The connection token shared by both peers.
    pub id: String,
    pub role: Role,
}

/// Metadata describing the payload stream that follows it.
///
/// Forwarded verbatim as plain JSON text regardless of the receiving
/// peer's transport kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub file_name: String,
    pub mime_type: String,
    pub total_chunks: u32,
    pub chunk_index: u32,
}

/// A classified inbound message.
#[derive(Clone, Debug)]
pub enum Frame {
    Handshake(HandshakeFrame),
    Metadata(FileMetadata),
    /// Raw payload bytes, already transport-decoded.
    Chunk(Vec<u8>),
    /// Recognized garbage from a misbehaving client; dropped silently.
    Ignored,
}

/// Classify a binary message. Binary frames are always payload chunks.
pub fn classify_binary(data: Vec<u8>) -> Frame {
    Frame::Chunk(data)
}

/// Classify a text message by inspecting its JSON structure.
pub fn classify_text(text: &str) -> Result<Frame, ClassifyError> {
    if text.contains(STRINGIFIED_BUFFER_MARKER) {
        return Ok(Frame::Ignored);
    }

    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ClassifyError::Malformed(e.to_string()))?;

    match value.get("type").and_then(|t| t.as_str()) {
        Some("connection") => {
            let handshake: HandshakeFrame = serde_json::from_value(value)
                .map_err(|e| ClassifyError::Malformed(format!("bad handshake: {e}")))?;
            Ok(Frame::Handshake(handshake))
        }
        Some("binary") => {
            let data = value.get("data").and_then(|d| d.as_str()).ok_or_else(|| {
                ClassifyError::Malformed("binary envelope missing data field".to_string())
            })?;
            Ok(Frame::Chunk(codec::decode_base64(data)?))
        }
        Some(other) => Err(ClassifyError::Malformed(format!(
            "unknown frame type: {other}"
        ))),
        // No discriminant: the only remaining well-formed shape is metadata.
        None => {
            let metadata: FileMetadata = serde_json::from_value(value)
                .map_err(|e| ClassifyError::Malformed(format!("bad metadata: {e}")))?;
            Ok(Frame::Metadata(metadata))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_classified() {
        let frame =
            classify_text(r#"{"type":"connection","id":"a1b2","role":"sender"}"#).unwrap();
        match frame {
            Frame::Handshake(hs) => {
                assert_eq!(hs.id, "a1b2");
                assert_eq!(hs.role, Role::Sender);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn handshake_missing_role_is_malformed() {
        let err = classify_text(r#"{"type":"connection","id":"a1b2"}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));
    }

    #[test]
    fn handshake_unknown_role_is_malformed() {
        let err =
            classify_text(r#"{"type":"connection","id":"a1b2","role":"observer"}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));
    }

    #[test]
    fn binary_envelope_decoded() {
        let frame = classify_text(r#"{"type":"binary","data":"AQI="}"#).unwrap();
        match frame {
            Frame::Chunk(bytes) => assert_eq!(bytes, vec![0x01, 0x02]),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn binary_envelope_bad_base64() {
        let err = classify_text(r#"{"type":"binary","data":"!!!"}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidBase64(_)));
    }

    #[test]
    fn binary_envelope_missing_data() {
        let err = classify_text(r#"{"type":"binary"}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));
    }

    #[test]
    fn metadata_classified() {
        let frame = classify_text(
            r#"{"fileName":"a.txt","mimeType":"text/plain","totalChunks":3,"chunkIndex":0}"#,
        )
        .unwrap();
        match frame {
            Frame::Metadata(meta) => {
                assert_eq!(meta.file_name, "a.txt");
                assert_eq!(meta.mime_type, "text/plain");
                assert_eq!(meta.total_chunks, 3);
                assert_eq!(meta.chunk_index, 0);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn metadata_missing_field_is_malformed() {
        let err = classify_text(r#"{"fileName":"a.txt","mimeType":"text/plain"}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));
    }

    #[test]
    fn metadata_round_trips_with_exact_keys() {
        let meta = FileMetadata {
            file_name: "a.txt".to_string(),
            mime_type: "text/plain".to_string(),
            total_chunks: 3,
            chunk_index: 1,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(
            json,
            r#"{"fileName":"a.txt","mimeType":"text/plain","totalChunks":3,"chunkIndex":1}"#
        );
    }

    #[test]
    fn unknown_type_is_malformed() {
        let err = classify_text(r#"{"type":"telemetry","data":"x"}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));
    }

    #[test]
    fn truncated_json_is_malformed() {
        let err = classify_text(r#"{"type":"connection","id":"#).unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));
    }

    #[test]
    fn non_object_text_is_malformed() {
        assert!(classify_text("42").is_err());
        assert!(classify_text("\"hello\"").is_err());
    }

    #[test]
    fn stringified_buffer_ignored() {
        let frame = classify_text("[object ArrayBuffer]").unwrap();
        assert!(matches!(frame, Frame::Ignored));
    }

    #[test]
    fn binary_message_is_always_a_chunk() {
        match classify_binary(vec![0xde, 0xad]) {
            Frame::Chunk(bytes) => assert_eq!(bytes, vec![0xde, 0xad]),
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
