//! Transport module - byte sources for the frame reader.
//!
//! Provides abstraction over:
//! - UDP datagram sockets ([`UdpTransport`])
//! - Serial devices ([`SerialTransport`])
//!
//! Both expose a single timeout-bounded receive primitive so a producer loop
//! can observe a stop request within one read cycle; nothing in the pipeline
//! ever blocks on a transport indefinitely.

mod serial;
mod udp;

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

pub use serial::{
    wait_for_device, SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_DEVICE_PATTERN,
    DEFAULT_GLOB_INTERVAL,
};
pub use udp::{UdpTransport, DEFAULT_HOST, DEFAULT_PORT};

/// A source of raw telemetry bytes.
///
/// Transport handles are held open for the reader's full lifetime and released
/// on drop; per-call timeouts bound individual receive attempts, not the
/// connection.
pub trait Transport: Send + 'static {
    /// One receive attempt, waiting at most `wait` for bytes to arrive.
    ///
    /// Returns:
    /// - `Ok(Some(n))` with `n > 0`: `n` bytes were written into `buf`
    /// - `Ok(Some(0))`: the transport reported closure (empty read)
    /// - `Ok(None)`: nothing arrived within `wait`
    fn recv_timeout(
        &mut self,
        buf: &mut [u8],
        wait: Duration,
    ) -> impl Future<Output = Result<Option<usize>>> + Send;
}
