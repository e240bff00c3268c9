//! Serial-mode frame validation.
//!
//! Node firmware prefixes every serial status line with a fixed magic preamble.
//! Anything on the wire that does not start with the preamble followed by `{`
//! is a lower-layer artifact (boot noise, partial flushes) and is dropped
//! without a decode attempt.

use bytes::Bytes;

/// Magic byte sequence prefixing every serial-mode frame.
pub const FRAME_PREAMBLE: &[u8] =
    b"\x00\x00\x00\x00\x08\x00\x00\x00\x00\x00\x00\x00~~\x00\x01\x00\x00\x00";

/// Validate a serial frame and extract its JSON payload.
///
/// Returns `None` unless the frame starts with [`FRAME_PREAMBLE`] immediately
/// followed by `{`. The preamble and surrounding whitespace are stripped, and
/// every `}]` sequence is corrected to `}`.
///
/// The `}]` correction is a compatibility shim for a known firmware framing
/// quirk: some status lines arrive with a stray `]` after the closing brace.
/// The exact trigger is undocumented upstream, so the fix stays this narrow.
pub fn sanitize_serial_frame(frame: &[u8]) -> Option<Bytes> {
    let payload = frame.strip_prefix(FRAME_PREAMBLE)?;
    if !payload.starts_with(b"{") {
        return None;
    }

    let trimmed = trim_ascii(payload);
    Some(Bytes::from(replace_artifact(trimmed)))
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Replace every `}]` with `}`.
fn replace_artifact(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'}' && bytes.get(i + 1) == Some(&b']') {
            out.push(b'}');
            i += 2;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}
