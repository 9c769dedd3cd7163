//! Network provider: link state and own hardware address from sysfs, UDP socket binding.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use tokio::net::UdpSocket;
use wol_core::{MacAddress, MacParseError};

use crate::relay::Datagram;

const SYSFS_NET: &str = "/sys/class/net";

/// What the relay needs from the network stack.
pub trait NetworkProvider {
    type Socket: Datagram;

    /// Confirm the network is usable. Returns the interface's own address when one is
    /// configured.
    fn join(&mut self) -> Result<Option<MacAddress>, NetworkError>;

    /// Bind the listening socket on the wildcard address, broadcast enabled.
    async fn bind(&mut self, port: u16) -> io::Result<Self::Socket>;

    /// Fresh connectivity query; never cached.
    fn is_connected(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("interface {0} not found")]
    NoInterface(String),
    #[error("interface {interface} is {state}")]
    LinkDown { interface: String, state: String },
    #[error("interface {interface} has unusable address: {source}")]
    Address {
        interface: String,
        source: MacParseError,
    },
}

/// Linux network stack. Link bring-up (DHCP, Wi-Fi association) is the OS's job; this
/// only observes it.
pub struct SysNetwork {
    interface: Option<String>,
    root: PathBuf,
}

impl SysNetwork {
    pub fn new(interface: Option<String>) -> Self {
        Self::with_root(interface, PathBuf::from(SYSFS_NET))
    }

    pub fn with_root(interface: Option<String>, root: PathBuf) -> Self {
        Self { interface, root }
    }

    fn read_attr(&self, interface: &str, attr: &str) -> Option<String> {
        std::fs::read_to_string(self.root.join(interface).join(attr))
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn operstate(&self, interface: &str) -> Option<String> {
        self.read_attr(interface, "operstate")
    }
}

// Loopback and many virtual links report "unknown" while passing traffic.
fn is_up(state: &str) -> bool {
    matches!(state, "up" | "unknown")
}

impl NetworkProvider for SysNetwork {
    type Socket = UdpSocket;

    fn join(&mut self) -> Result<Option<MacAddress>, NetworkError> {
        let Some(interface) = self.interface.as_deref() else {
            return Ok(None);
        };
        let state = self
            .operstate(interface)
            .ok_or_else(|| NetworkError::NoInterface(interface.to_string()))?;
        if !is_up(&state) {
            return Err(NetworkError::LinkDown {
                interface: interface.to_string(),
                state,
            });
        }
        let text = self
            .read_attr(interface, "address")
            .ok_or_else(|| NetworkError::NoInterface(interface.to_string()))?;
        let mac = MacAddress::parse(&text).map_err(|source| NetworkError::Address {
            interface: interface.to_string(),
            source,
        })?;
        tracing::info!("interface {} is {} with address {}", interface, state, mac);
        Ok(Some(mac))
    }

    async fn bind(&mut self, port: u16) -> io::Result<UdpSocket> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await?;
        socket.set_broadcast(true)?;
        Ok(socket)
    }

    fn is_connected(&self) -> bool {
        match self.interface.as_deref() {
            Some(interface) => self.operstate(interface).is_some_and(|s| is_up(&s)),
            None => true,
        }
    }
}
