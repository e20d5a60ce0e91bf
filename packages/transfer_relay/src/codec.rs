//! Transport-adaptive chunk encoding.
//!
//! Native peers take chunk bytes as raw binary frames. Fallback peers
//! only speak text, so chunk bytes go out wrapped in a JSON envelope
//! `{"type":"binary","data":"<base64>"}`. Decoding of inbound envelopes
//! lives in the classifier ([`crate::classify_text`]); a bad envelope is
//! a classification failure, not a relay failure.

use data_encoding::BASE64;

use crate::error::ClassifyError;
use crate::peer::{OutboundFrame, TransportKind};

/// Encode chunk bytes for the receiving peer's transport kind.
pub fn encode_chunk(bytes: &[u8], transport: TransportKind) -> OutboundFrame {
    match transport {
        TransportKind::Native => OutboundFrame::Binary(bytes.to_vec()),
        TransportKind::Fallback => {
            // Standard base64 never needs JSON escaping, so the envelope
            // can be assembled directly.
            let payload = BASE64.encode(bytes);
            OutboundFrame::Text(format!(r#"{{"type":"binary","data":"{payload}"}}"#))
        }
    }
}

/// Decode the base64 payload of a fallback envelope.
pub(crate) fn decode_base64(data: &str) -> Result<Vec<u8>, ClassifyError> {
    BASE64
        .decode(data.as_bytes())
        .map_err(|e| ClassifyError::InvalidBase64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, classify_text};

    #[test]
    fn native_passes_bytes_through() {
        let frame = encode_chunk(&[0x01, 0x02, 0xff], TransportKind::Native);
        assert_eq!(frame, OutboundFrame::Binary(vec![0x01, 0x02, 0xff]));
    }

    #[test]
    fn fallback_wraps_in_envelope() {
        let frame = encode_chunk(&[0x01, 0x02], TransportKind::Fallback);
        assert_eq!(
            frame,
            OutboundFrame::Text(r#"{"type":"binary","data":"AQI="}"#.to_string())
        );
    }

    #[test]
    fn fallback_empty_chunk() {
        let frame = encode_chunk(&[], TransportKind::Fallback);
        assert_eq!(
            frame,
            OutboundFrame::Text(r#"{"type":"binary","data":""}"#.to_string())
        );
    }

    #[test]
    fn round_trip_both_transports() {
        let payloads: [&[u8]; 4] = [b"", b"a", &[0x00, 0x7f, 0x80, 0xff], b"hello relay"];
        for bytes in payloads {
            match encode_chunk(bytes, TransportKind::Native) {
                OutboundFrame::Binary(out) => assert_eq!(out, bytes),
                other => panic!("unexpected frame: {other:?}"),
            }
            match encode_chunk(bytes, TransportKind::Fallback) {
                OutboundFrame::Text(text) => match classify_text(&text).unwrap() {
                    Frame::Chunk(out) => assert_eq!(out, bytes),
                    other => panic!("unexpected frame: {other:?}"),
                },
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    #[test]
    fn bad_base64_rejected() {
        assert!(decode_base64("not base64!!").is_err());
    }
}
