//! Wake-on-LAN relay core.
//! Host-driven: no I/O; host passes events and receives actions.

pub mod fault;
pub mod identity;
pub mod protocol;
pub mod status;
pub mod trigger;
pub mod wire;

pub use identity::{MacAddress, MacParseError};
pub use protocol::{MagicPacket, RelayTarget, DEFAULT_PORT, MAGIC_PACKET_LEN};
pub use status::{Color, Pattern, Signal};
pub use trigger::{should_relay, Decision, TriggerMode, TriggerPolicy};
pub use wire::{encode, validate};
pub use fault::{classify_io, ConnectStage, Fault, FaultClass};
pub use crate::core::{Action, RelayCore, State};

pub mod core;
