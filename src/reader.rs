//! Frame reader - poll loop and buffer drain over one transport.
//!
//! [`FrameReader`] owns the receive buffer for a transport and splits the two
//! halves of line framing apart:
//!
//! - [`FrameReader::poll`] moves bytes from the transport into the buffer,
//!   retrying with a fixed backoff until a delimiter arrives, the transport
//!   closes, or the deadline passes
//! - [`FrameReader::drain_frames`] is a pure buffer drain that never touches
//!   the transport
//!
//! In serial mode every frame must additionally carry the firmware preamble;
//! frames without it are lower-layer artifacts and are dropped silently.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::decode::{decode_line, Message};
use crate::framing::{sanitize_serial_frame, LineBuffer};
use crate::transport::Transport;
use crate::Result;

/// Default receive chunk size (one max-size UDP datagram).
pub const DEFAULT_CHUNK_SIZE: usize = u16::MAX as usize;

/// Default backoff between receive attempts when the transport is idle.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// Outcome of one [`FrameReader::poll`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// At least one complete frame is buffered.
    Framed,
    /// The transport reported closure (empty read).
    Closed,
    /// The deadline passed with no complete frame.
    TimedOut,
}

/// Per-frame validation applied while draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Frames are used as-is.
    Plain,
    /// Frames must start with the serial preamble; see [`crate::framing`].
    SerialPreamble,
}

/// Reads delimiter-terminated frames from a transport.
pub struct FrameReader<T> {
    transport: T,
    buffer: LineBuffer,
    recv_buf: Vec<u8>,
    backoff: Duration,
    framing: Framing,
}

impl<T: Transport> FrameReader<T> {
    /// Create a reader with default chunk size, backoff and plain framing.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            buffer: LineBuffer::new(),
            recv_buf: vec![0u8; DEFAULT_CHUNK_SIZE],
            backoff: DEFAULT_BACKOFF,
            framing: Framing::Plain,
        }
    }

    /// Set the frame delimiter byte.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.buffer = LineBuffer::with_delimiter(delimiter);
        self
    }

    /// Set the per-read chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.recv_buf = vec![0u8; chunk_size.max(1)];
        self
    }

    /// Set the idle backoff between receive attempts.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Require the serial firmware preamble on every frame.
    pub fn with_serial_framing(mut self) -> Self {
        self.framing = Framing::SerialPreamble;
        self
    }

    /// Pull bytes from the transport until a delimiter appears in the buffer,
    /// the transport closes, or `timeout` elapses.
    ///
    /// Each cycle is one timeout-bounded receive attempt; the backoff interval
    /// keeps the loop from spinning while the transport is idle.
    pub async fn poll(&mut self, timeout: Duration) -> Result<PollStatus> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.transport.recv_timeout(&mut self.recv_buf, self.backoff).await? {
                Some(0) => return Ok(PollStatus::Closed),
                Some(n) => {
                    self.buffer.extend(&self.recv_buf[..n]);
                    if self.buffer.has_frame() {
                        return Ok(PollStatus::Framed);
                    }
                }
                None => {}
            }

            if Instant::now() >= deadline {
                return Ok(PollStatus::TimedOut);
            }
        }
    }

    /// Run [`poll`](Self::poll) `n` times, accumulating whatever arrives.
    ///
    /// Useful for gathering a batch across several poll windows before a
    /// drain; stops early if the transport closes.
    pub async fn poll_many(&mut self, timeout: Duration, n: usize) -> Result<PollStatus> {
        let mut last = PollStatus::TimedOut;
        for _ in 0..n {
            last = self.poll(timeout).await?;
            if last == PollStatus::Closed {
                break;
            }
        }
        Ok(last)
    }

    /// Drain all complete frames currently buffered.
    ///
    /// Pure buffer operation: repeatedly slices out the bytes before the next
    /// delimiter and advances past it, leaving any partial frame for the next
    /// read. In serial mode, frames failing preamble validation are dropped.
    pub fn drain_frames(&mut self) -> Vec<Bytes> {
        let frames = self.buffer.drain();
        match self.framing {
            Framing::Plain => frames,
            Framing::SerialPreamble => frames
                .iter()
                .filter_map(|f| sanitize_serial_frame(f))
                .collect(),
        }
    }

    /// Drain buffered frames and decode them as telemetry messages.
    ///
    /// Malformed lines are dropped with a warning; empty frames are skipped.
    pub fn drain_messages(&mut self) -> Vec<Message> {
        self.drain_frames()
            .iter()
            .filter_map(|f| decode_line(f))
            .collect()
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
