//! Frame codec tests: round-trip law, EOF vs truncation, size ceilings.

use serde_json::json;

use crate::errors::ProtocolError;
use crate::protocol::{FrameReader, FrameWriter};

fn frame_bytes(payload: &[u8]) -> Vec<u8> {
    let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

#[tokio::test]
async fn test_round_trip_preserves_message() {
    let message = json!({
        "id": 42,
        "command": "navigate",
        "params": { "url": "https://example.com", "note": "ünïcodé" },
    });

    let mut buf = Vec::new();
    FrameWriter::new(&mut buf)
        .write_message(&message)
        .await
        .expect("encode");

    let mut reader = FrameReader::new(buf.as_slice());
    let decoded = reader.read_message().await.expect("decode");
    assert_eq!(decoded, Some(message));
    // Stream is exhausted afterwards: clean EOF, not an error.
    assert!(reader.read_message().await.expect("eof").is_none());
}

#[tokio::test]
async fn test_multiple_frames_decode_in_order() {
    let mut buf = Vec::new();
    let mut writer = FrameWriter::new(&mut buf);
    for i in 0..3 {
        writer.write_message(&json!({ "seq": i })).await.expect("encode");
    }

    let mut reader = FrameReader::new(buf.as_slice());
    for i in 0..3 {
        let message = reader.read_message().await.expect("decode").expect("frame");
        assert_eq!(message, json!({ "seq": i }));
    }
    assert!(reader.read_message().await.expect("eof").is_none());
}

#[tokio::test]
async fn test_header_is_little_endian() {
    let mut bytes = vec![2, 0, 0, 0];
    bytes.extend_from_slice(b"{}");
    let decoded = FrameReader::new(bytes.as_slice())
        .read_message()
        .await
        .expect("decode");
    assert_eq!(decoded, Some(json!({})));
}

#[tokio::test]
async fn test_empty_stream_is_clean_eof() {
    let decoded = FrameReader::new(&[][..]).read_message().await.expect("eof");
    assert!(decoded.is_none());
}

#[tokio::test]
async fn test_partial_header_is_truncation() {
    let err = FrameReader::new(&[5u8, 0][..])
        .read_message()
        .await
        .expect_err("partial header");
    assert!(matches!(
        err,
        ProtocolError::Truncated { expected: 4, got: 2 }
    ));
}

#[tokio::test]
async fn test_short_payload_is_truncation_not_eof() {
    let mut bytes = (10u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(b"abc");
    let err = FrameReader::new(bytes.as_slice())
        .read_message()
        .await
        .expect_err("short payload");
    assert!(matches!(
        err,
        ProtocolError::Truncated {
            expected: 10,
            got: 3
        }
    ));
}

#[tokio::test]
async fn test_zero_length_frame_decodes_to_empty_object() {
    let bytes = (0u32).to_le_bytes().to_vec();
    let decoded = FrameReader::new(bytes.as_slice())
        .read_message()
        .await
        .expect("decode");
    assert_eq!(decoded, Some(json!({})));
}

#[tokio::test]
async fn test_oversize_declared_length_rejected() {
    let bytes = (100u32).to_le_bytes().to_vec();
    let err = FrameReader::with_limit(bytes.as_slice(), 16)
        .read_message()
        .await
        .expect_err("oversize");
    assert!(matches!(
        err,
        ProtocolError::FrameTooLarge {
            len: 100,
            limit: 16
        }
    ));
}

#[tokio::test]
async fn test_malformed_json_payload_rejected() {
    let bytes = frame_bytes(b"not json at all");
    let err = FrameReader::new(bytes.as_slice())
        .read_message()
        .await
        .expect_err("bad json");
    assert!(matches!(err, ProtocolError::Json(_)));
}

#[tokio::test]
async fn test_oversize_encode_writes_nothing() {
    let big = json!({ "data": "x".repeat(64) });
    let mut buf = Vec::new();
    let err = FrameWriter::with_limit(&mut buf, 16)
        .write_message(&big)
        .await
        .expect_err("too large");
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    // The whole point of checking before writing: no partial frame.
    assert!(buf.is_empty());
}

#[tokio::test]
async fn test_writer_stays_usable_after_rejected_encode() {
    let mut buf = Vec::new();
    let mut writer = FrameWriter::with_limit(&mut buf, 64);
    let big = json!({ "data": "x".repeat(100) });
    assert!(writer.write_message(&big).await.is_err());
    writer.write_message(&json!({ "ok": true })).await.expect("small frame");

    let decoded = FrameReader::new(buf.as_slice())
        .read_message()
        .await
        .expect("decode");
    assert_eq!(decoded, Some(json!({ "ok": true })));
}
