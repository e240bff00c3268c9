//! UDP datagram transport.
//!
//! Sensor nodes send status lines as datagrams to a well-known local port.
//! There is no acknowledgment and no retransmission; loss is silent.

use std::time::Duration;

use tokio::net::UdpSocket;

use super::Transport;
use crate::error::Result;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 61393;

/// A bound UDP socket yielding raw datagram bytes.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind to the given host and port.
    ///
    /// A bind conflict is fatal; there is no open-time retry.
    pub async fn bind(host: &str, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind((host, port)).await?;
        tracing::info!(addr = %socket.local_addr()?, "UDP transport bound");
        Ok(Self { socket })
    }

    /// Bind to the default endpoint (`127.0.0.1:61393`).
    pub async fn bind_default() -> Result<Self> {
        Self::bind(DEFAULT_HOST, DEFAULT_PORT).await
    }

    /// The locally bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    async fn recv_timeout(&mut self, buf: &mut [u8], wait: Duration) -> Result<Option<usize>> {
        match self.socket.try_recv_from(buf) {
            Ok((n, _addr)) => Ok(Some(n)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                // Nothing pending; back off for one cycle instead of spinning.
                tokio::time::sleep(wait).await;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
