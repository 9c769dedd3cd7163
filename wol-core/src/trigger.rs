//! Trigger policy: decide whether a received magic packet should be relayed.

use serde::{Deserialize, Serialize};

use crate::identity::MacAddress;
use crate::protocol::MagicPacket;

/// When to relay. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Relay every structurally valid magic packet.
    AcceptAny,
    /// Relay only packets whose first MAC block is this device's own address.
    /// Lets several relays share one broadcast domain and port without cross-triggering.
    MatchSelf(MacAddress),
}

/// Policy name as written in configuration; `MatchSelf` gets its address from the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerMode {
    #[default]
    AcceptAny,
    MatchSelf,
}

impl TriggerMode {
    /// Resolve to a policy. `None` when `MatchSelf` is asked for without an own address.
    pub fn into_policy(self, own_mac: Option<MacAddress>) -> Option<TriggerPolicy> {
        match self {
            TriggerMode::AcceptAny => Some(TriggerPolicy::AcceptAny),
            TriggerMode::MatchSelf => own_mac.map(TriggerPolicy::MatchSelf),
        }
    }
}

impl std::str::FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "accept-any" => Ok(TriggerMode::AcceptAny),
            "match-self" => Ok(TriggerMode::MatchSelf),
            other => Err(format!("unknown trigger policy {other:?}")),
        }
    }
}

/// Outcome of evaluating one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Relay,
    /// Valid packet for some other device. Expected on a shared broadcast domain.
    IgnoreForeignTarget,
    /// Not a magic packet at all.
    IgnoreInvalid,
}

/// Apply `policy` to the result of `wire::validate`.
pub fn should_relay(packet: Option<&MagicPacket>, policy: &TriggerPolicy) -> Decision {
    let Some(packet) = packet else {
        return Decision::IgnoreInvalid;
    };
    match policy {
        TriggerPolicy::AcceptAny => Decision::Relay,
        TriggerPolicy::MatchSelf(own) => {
            if packet.target().as_bytes() == own.as_bytes() {
                Decision::Relay
            } else {
                Decision::IgnoreForeignTarget
            }
        }
    }
}
