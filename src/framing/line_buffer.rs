//! Line buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. Transports hand over
//! whatever chunk of bytes they received; the buffer slices out one frame per
//! delimiter occurrence and keeps the trailing partial frame for the next read.
//!
//! # Example
//!
//! ```
//! use nodeline::framing::LineBuffer;
//!
//! let mut buffer = LineBuffer::new();
//!
//! // Data arrives in chunks from the socket
//! let frames = buffer.push(b"{\"sender_node_id\": 7}\n{\"sender");
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(&frames[0][..], b"{\"sender_node_id\": 7}");
//! assert!(!buffer.is_empty()); // partial second frame stays buffered
//! ```

use bytes::{Bytes, BytesMut};

/// Default frame delimiter (newline-delimited JSON).
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// Initial buffer capacity (one max-size UDP datagram).
const INITIAL_CAPACITY: usize = 64 * 1024;

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// Frames are the byte runs between delimiter occurrences; the delimiter itself
/// is consumed and never part of a frame. After any drain the buffer holds at
/// most one trailing partial frame.
pub struct LineBuffer {
    /// Accumulated bytes from transport reads.
    buffer: BytesMut,
    /// Frame delimiter byte.
    delimiter: u8,
}

impl LineBuffer {
    /// Create a new line buffer with the default `\n` delimiter.
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }

    /// Create a new line buffer with a custom delimiter byte.
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            delimiter,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns a vector of complete frames (may be empty if no delimiter has
    /// arrived yet). Partial data is buffered internally for the next push.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.extend(data);
        self.drain()
    }

    /// Append data to the buffer without extracting frames.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Extract all complete frames currently in the buffer.
    ///
    /// Stops when no delimiter remains; any trailing partial frame stays
    /// buffered.
    pub fn drain(&mut self) -> Vec<Bytes> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns `None` if no delimiter is present.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let i = self
            .buffer
            .iter()
            .position(|&b| b == self.delimiter)?;

        let frame = self.buffer.split_to(i).freeze();
        // Consume the delimiter itself.
        let _ = self.buffer.split_to(1);
        Some(frame)
    }

    /// Check whether a complete frame is available.
    pub fn has_frame(&self) -> bool {
        self.buffer.contains(&self.delimiter)
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer, discarding any partial frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = LineBuffer::new();

        let frames = buffer.push(b"hello\n");

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = LineBuffer::new();

        let frames = buffer.push(b"first\nsecond\nthird\n");

        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[0][..], b"first");
        assert_eq!(&frames[1][..], b"second");
        assert_eq!(&frames[2][..], b"third");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_frame_stays_buffered() {
        let mut buffer = LineBuffer::new();

        let frames = buffer.push(b"first\nsec");
        assert_eq!(frames.len(), 1);
        assert_eq!(buffer.len(), 3);

        let frames = buffer.push(b"ond\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"second");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_split_at_arbitrary_points() {
        // The concatenation of the chunks is three frames; split points are
        // arbitrary, including mid-frame and right after a delimiter.
        let chunks: &[&[u8]] = &[b"{\"a\"", b": 1}\n{\"b\": 2}", b"\n", b"{\"c\": 3}\n"];

        let mut buffer = LineBuffer::new();
        let mut all = Vec::new();
        for chunk in chunks {
            all.extend(buffer.push(chunk));
        }

        assert_eq!(all.len(), 3);
        assert_eq!(&all[0][..], b"{\"a\": 1}");
        assert_eq!(&all[1][..], b"{\"b\": 2}");
        assert_eq!(&all[2][..], b"{\"c\": 3}");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = LineBuffer::new();
        let data = b"one\ntwo\n";

        let mut all = Vec::new();
        for byte in data {
            all.extend(buffer.push(&[*byte]));
        }

        assert_eq!(all.len(), 2);
        assert_eq!(&all[0][..], b"one");
        assert_eq!(&all[1][..], b"two");
    }

    #[test]
    fn test_empty_frame_between_delimiters() {
        let mut buffer = LineBuffer::new();

        let frames = buffer.push(b"a\n\nb\n");

        assert_eq!(frames.len(), 3);
        assert!(frames[1].is_empty());
    }

    #[test]
    fn test_custom_delimiter() {
        let mut buffer = LineBuffer::with_delimiter(b';');

        let frames = buffer.push(b"a;b;");

        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"a");
        assert_eq!(&frames[1][..], b"b");
    }

    #[test]
    fn test_has_frame() {
        let mut buffer = LineBuffer::new();

        buffer.extend(b"partial");
        assert!(!buffer.has_frame());

        buffer.extend(b" frame\n");
        assert!(buffer.has_frame());

        buffer.drain();
        assert!(!buffer.has_frame());
    }

    #[test]
    fn test_clear_discards_partial() {
        let mut buffer = LineBuffer::new();

        buffer.push(b"dangling");
        assert!(!buffer.is_empty());

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
