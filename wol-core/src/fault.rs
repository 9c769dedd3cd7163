//! Fault classification. Turns runtime failures into one of a few fixed responses;
//! there is no retry counting, so the same fault always gets the same answer.

use std::io;

use crate::status::Signal;

// errno values reported by Linux and by lwIP-based stacks.
const ECONNRESET: i32 = 104;
const EHOSTUNREACH: i32 = 113;
const ENOMEM: i32 = 12;

/// How the controller reacts to a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Keep going; nothing to do.
    Transient,
    /// Backoff, then restart the process.
    Recoverable,
    /// Backoff, then restart the process.
    Fatal,
    /// Fails before the loop starts; no recovery.
    ConfigInvalid,
}

/// What went wrong while bringing the network up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    /// Network join failed.
    Join,
    /// Listening socket could not be bound.
    Bind,
    /// Link reported down while listening.
    LinkLost,
}

/// Recognised disruptive I/O conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisruptiveKind {
    ConnectionReset,
    HostUnreachable,
    OutOfMemory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    ConfigInvalid(String),
    Connectivity(ConnectStage),
    /// Timed out / would block.
    TransientIo,
    Disruptive(DisruptiveKind),
    /// Anything else. Never swallowed.
    Unclassified(String),
}

impl Fault {
    pub fn class(&self) -> FaultClass {
        match self {
            Fault::ConfigInvalid(_) => FaultClass::ConfigInvalid,
            Fault::TransientIo => FaultClass::Transient,
            Fault::Connectivity(_) | Fault::Disruptive(_) => FaultClass::Recoverable,
            Fault::Unclassified(_) => FaultClass::Fatal,
        }
    }

    /// Signal shown while handling the fault. Transient and config faults have none.
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Fault::ConfigInvalid(_) | Fault::TransientIo => None,
            Fault::Connectivity(ConnectStage::Bind) => Some(Signal::SocketSetupFailure),
            Fault::Connectivity(_) => Some(Signal::ConnectFailure),
            Fault::Disruptive(_) => Some(Signal::NetworkFault),
            Fault::Unclassified(_) => Some(Signal::UnknownFault),
        }
    }

    /// Whether handling this fault ends in a process restart.
    pub fn needs_restart(&self) -> bool {
        matches!(self.class(), FaultClass::Recoverable | FaultClass::Fatal)
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fault::ConfigInvalid(msg) => write!(f, "invalid configuration: {msg}"),
            Fault::Connectivity(ConnectStage::Join) => f.write_str("network join failed"),
            Fault::Connectivity(ConnectStage::Bind) => f.write_str("socket setup failed"),
            Fault::Connectivity(ConnectStage::LinkLost) => f.write_str("network link lost"),
            Fault::TransientIo => f.write_str("transient I/O condition"),
            Fault::Disruptive(kind) => write!(f, "network fault: {kind:?}"),
            Fault::Unclassified(msg) => write!(f, "unexpected error: {msg}"),
        }
    }
}

/// Classify a send/receive error. Unknown errors are `Unclassified`, never transient.
pub fn classify_io(err: &io::Error) -> Fault {
    match err.raw_os_error() {
        Some(ECONNRESET) => return Fault::Disruptive(DisruptiveKind::ConnectionReset),
        Some(EHOSTUNREACH) => return Fault::Disruptive(DisruptiveKind::HostUnreachable),
        Some(ENOMEM) => return Fault::Disruptive(DisruptiveKind::OutOfMemory),
        _ => {}
    }
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Fault::TransientIo,
        io::ErrorKind::ConnectionReset => Fault::Disruptive(DisruptiveKind::ConnectionReset),
        io::ErrorKind::OutOfMemory => Fault::Disruptive(DisruptiveKind::OutOfMemory),
        _ => Fault::Unclassified(err.to_string()),
    }
}
