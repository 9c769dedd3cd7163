//! Relay engine: one outbound datagram per relay decision, no retries.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use wol_core::MagicPacket;

/// Bound datagram socket, as handed to the listener.
pub trait Datagram {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;
}

impl Datagram for UdpSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }

    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("send failed: {0}")]
    Io(#[from] io::Error),
    #[error("short send: {sent} of {expected} bytes")]
    Truncated { sent: usize, expected: usize },
}

impl SendError {
    /// Fold into an I/O error for classification; a short send is not a known condition.
    pub fn into_io(self) -> io::Error {
        match self {
            SendError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}

/// Send the precomputed packet to `destination` exactly once.
pub async fn relay<S: Datagram>(
    socket: &S,
    packet: &MagicPacket,
    destination: SocketAddr,
) -> Result<(), SendError> {
    let bytes = packet.as_bytes();
    let sent = socket.send_to(bytes, destination).await?;
    if sent != bytes.len() {
        return Err(SendError::Truncated {
            sent,
            expected: bytes.len(),
        });
    }
    Ok(())
}
