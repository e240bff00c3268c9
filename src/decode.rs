//! Line decoder - frame bytes to telemetry messages.
//!
//! Decode failures are never fatal to the stream: a malformed line is logged
//! with its raw content and dropped, and the next frame decodes as usual.

use serde_json::Value;

/// A decoded telemetry message.
///
/// Messages carry no fixed schema before normalization; only `sender_node_id`
/// is treated as a required key for grouping.
pub type Message = serde_json::Map<String, Value>;

/// Key identifying the sensor node that produced a message.
pub const SENDER_KEY: &str = "sender_node_id";

/// Decode a frame as one JSON telemetry message.
///
/// Returns `None` for empty or whitespace-only frames (not an error). On JSON
/// syntax failure, or when the frame holds valid JSON that is not an object,
/// emits a warning with the raw frame and returns `None`.
pub fn decode_line(frame: &[u8]) -> Option<Message> {
    if frame.iter().all(|b| b.is_ascii_whitespace()) {
        return None;
    }

    match serde_json::from_slice::<Value>(frame) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            tracing::warn!(
                frame = %String::from_utf8_lossy(frame),
                kind = json_kind(&other),
                "status line is valid JSON but not an object, dropping"
            );
            None
        }
        Err(e) => {
            tracing::warn!(
                frame = %String::from_utf8_lossy(frame),
                error = %e,
                "failed to decode status line as JSON"
            );
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_object() {
        let msg = decode_line(b"{\"sender_node_id\": 7, \"spl\": 61.2}").unwrap();

        assert_eq!(msg.get("sender_node_id"), Some(&Value::from(7)));
        assert_eq!(msg.get("spl"), Some(&Value::from(61.2)));
    }

    #[test]
    fn test_decode_empty_frame() {
        assert!(decode_line(b"").is_none());
    }

    #[test]
    fn test_decode_whitespace_frame() {
        assert!(decode_line(b"  \r\t").is_none());
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(decode_line(b"{\"sender_node_id\": ").is_none());
    }

    #[test]
    fn test_decode_non_object_json() {
        assert!(decode_line(b"[1, 2, 3]").is_none());
        assert!(decode_line(b"42").is_none());
    }

    #[test]
    fn test_decode_mixed_stream_keeps_valid_lines() {
        let lines: &[&[u8]] = &[
            b"{\"sender_node_id\": 1}",
            b"not json at all",
            b"{\"sender_node_id\": 2}",
            b"{broken",
            b"{\"sender_node_id\": 3}",
        ];

        let decoded: Vec<Message> = lines.iter().filter_map(|l| decode_line(l)).collect();

        assert_eq!(decoded.len(), 3);
        let ids: Vec<i64> = decoded
            .iter()
            .map(|m| m.get("sender_node_id").and_then(Value::as_i64).unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
