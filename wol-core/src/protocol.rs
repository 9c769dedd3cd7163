//! Wake-on-LAN wire protocol: magic packet layout, relay target.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::identity::{MacAddress, MAC_LEN};

/// Length of the sync header (`0xFF` bytes) that opens every magic packet.
pub const SYNC_LEN: usize = 6;

/// Sync header byte.
pub const SYNC_BYTE: u8 = 0xFF;

/// Number of times the target MAC is repeated after the sync header.
pub const MAC_REPETITIONS: usize = 16;

/// Total magic packet length: 6 + 6 * 16 = 102 bytes.
pub const MAGIC_PACKET_LEN: usize = SYNC_LEN + MAC_LEN * MAC_REPETITIONS;

/// Standard Wake-on-LAN port ("discard"). Port 7 is also common.
pub const DEFAULT_PORT: u16 = 9;

/// A complete 102-byte magic packet.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    /// Wrap raw bytes. Caller guarantees the sync header is present.
    pub(crate) fn from_bytes(bytes: [u8; MAGIC_PACKET_LEN]) -> Self {
        MagicPacket(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MAGIC_PACKET_LEN] {
        &self.0
    }

    /// The first MAC block after the sync header: the address this packet wakes.
    pub fn target(&self) -> MacAddress {
        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&self.0[SYNC_LEN..SYNC_LEN + MAC_LEN]);
        MacAddress::new(mac)
    }
}

impl std::fmt::Debug for MagicPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicPacket")
            .field("target", &self.target())
            .finish()
    }
}

impl AsRef<[u8]> for MagicPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Where relayed packets go and which device they wake. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayTarget {
    /// Destination address, typically the subnet broadcast address.
    pub ip: IpAddr,
    pub port: u16,
    /// Device to wake.
    pub mac: MacAddress,
}

impl RelayTarget {
    pub fn new(ip: IpAddr, port: u16, mac: MacAddress) -> Self {
        Self { ip, port, mac }
    }

    pub fn destination(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl Default for RelayTarget {
    fn default() -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 255)),
            port: DEFAULT_PORT,
            mac: MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_length_is_102() {
        assert_eq!(MAGIC_PACKET_LEN, 102);
    }

    #[test]
    fn default_target_is_subnet_broadcast_on_port_9() {
        let t = RelayTarget::default();
        assert_eq!(t.destination().to_string(), "192.168.1.255:9");
        assert_eq!(t.mac.to_string(), "AA:BB:CC:DD:EE:FF");
    }
}
