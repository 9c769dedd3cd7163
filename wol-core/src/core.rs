//! Host-driven API: RelayCore receives events from the host and returns actions.
//!
//! The host owns the socket, timers, indicator and process. The core owns the
//! recovery state machine and the precomputed outbound packet.

use std::io;
use std::net::SocketAddr;

use crate::fault::{self, ConnectStage, Fault};
use crate::identity::MacAddress;
use crate::protocol::{MagicPacket, RelayTarget};
use crate::status::Signal;
use crate::trigger::{self, Decision, TriggerMode, TriggerPolicy};
use crate::wire;

/// Where the relay is in its life. Every run starts at `Startup`; nothing survives `Restart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Startup,
    /// Parked until power cycle. No networking.
    MaintenancePause,
    Connecting,
    Listening,
    FaultBackoff,
    Restart,
}

/// Action for host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Show the signal forever. Never leave this.
    Pause(Signal),
    /// Join the network and bind the socket, then report `on_connected` (with the
    /// interface's own address, if known) or `on_connect_failed`.
    Connect,
    /// Check connectivity (`on_connectivity`) and do one bounded receive.
    Receive,
    /// Send `RelayCore::outbound` to `RelayCore::destination` once, then report `on_sent`
    /// or `on_io_error`.
    Relay,
    /// Show the signal, then keep receiving.
    Notify(Signal),
    /// Wait the settle delay, show the fault's signal, then report `on_backoff_elapsed`.
    Backoff(Fault),
    /// Restart the process. With `settle`, first wait the settle delay and show the
    /// fault's signal.
    Restart { fault: Fault, settle: bool },
}

/// Main coordinator. Host passes events; core returns actions.
pub struct RelayCore {
    target: RelayTarget,
    mode: TriggerMode,
    /// Resolved once the interface address is known.
    policy: Option<TriggerPolicy>,
    outbound: MagicPacket,
    state: State,
}

impl RelayCore {
    /// Build the core. The outbound packet is computed here, once.
    pub fn new(target: RelayTarget, mode: TriggerMode) -> Self {
        Self {
            outbound: wire::encode(&target.mac),
            target,
            mode,
            policy: None,
            state: State::Startup,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn target(&self) -> &RelayTarget {
        &self.target
    }

    /// `None` until connected.
    pub fn policy(&self) -> Option<&TriggerPolicy> {
        self.policy.as_ref()
    }

    /// Packet sent on every relay. Identical for the life of the process.
    pub fn outbound(&self) -> &MagicPacket {
        &self.outbound
    }

    pub fn destination(&self) -> SocketAddr {
        self.target.destination()
    }

    /// Boot decision. `maintenance` is the externally supplied "developer attached" signal.
    pub fn boot(&mut self, maintenance: bool) -> Action {
        if self.state != State::Startup {
            return self.unexpected("boot");
        }
        if maintenance {
            self.state = State::MaintenancePause;
            tracing::info!("maintenance precondition present; relay paused");
            Action::Pause(Signal::Paused)
        } else {
            self.state = State::Connecting;
            Action::Connect
        }
    }

    /// Network joined and socket bound. `own_mac` is the interface's hardware address;
    /// `MatchSelf` cannot run without it and counts as a failed join.
    pub fn on_connected(&mut self, own_mac: Option<MacAddress>) -> Action {
        if self.state != State::Connecting {
            return self.unexpected("on_connected");
        }
        let Some(policy) = self.mode.into_policy(own_mac) else {
            tracing::error!("match-self policy needs the interface's own address");
            return self.on_connect_failed(ConnectStage::Join);
        };
        self.policy = Some(policy);
        self.state = State::Listening;
        Action::Receive
    }

    /// Join or bind failed. Crash-only: no partial retry, straight to restart.
    pub fn on_connect_failed(&mut self, stage: ConnectStage) -> Action {
        if self.state != State::Connecting {
            return self.unexpected("on_connect_failed");
        }
        self.restart(Fault::Connectivity(stage), true)
    }

    /// Connectivity polled at the top of each listening iteration.
    pub fn on_connectivity(&mut self, connected: bool) -> Action {
        if self.state != State::Listening {
            return self.unexpected("on_connectivity");
        }
        if connected {
            Action::Receive
        } else {
            self.restart(Fault::Connectivity(ConnectStage::LinkLost), true)
        }
    }

    /// Receive bound elapsed with no data. The common, silent case.
    pub fn on_timeout(&mut self) -> Action {
        if self.state != State::Listening {
            return self.unexpected("on_timeout");
        }
        Action::Receive
    }

    /// Evaluate the first `len` bytes of `buf` against the trigger policy.
    pub fn evaluate(&self, buf: &[u8], len: usize) -> Decision {
        let Some(policy) = &self.policy else {
            return Decision::IgnoreInvalid;
        };
        let packet = wire::validate(buf, len);
        trigger::should_relay(packet.as_ref(), policy)
    }

    /// A datagram arrived from `sender`.
    pub fn on_datagram(&mut self, buf: &[u8], len: usize, sender: SocketAddr) -> Action {
        if self.state != State::Listening {
            return self.unexpected("on_datagram");
        }
        match self.evaluate(buf, len) {
            Decision::Relay => {
                tracing::info!("magic packet received from {}", sender.ip());
                Action::Relay
            }
            Decision::IgnoreForeignTarget => {
                if let Some(packet) = wire::validate(buf, len) {
                    tracing::info!(
                        "ignored magic packet for {} from {}",
                        packet.target(),
                        sender.ip()
                    );
                }
                Action::Notify(Signal::ForeignTargetIgnored)
            }
            Decision::IgnoreInvalid => {
                tracing::debug!("ignored non-magic packet ({} bytes) from {}", len, sender.ip());
                Action::Receive
            }
        }
    }

    /// The relay datagram went out.
    pub fn on_sent(&mut self) -> Action {
        if self.state != State::Listening {
            return self.unexpected("on_sent");
        }
        tracing::info!("relayed packet for {} to {}", self.target.mac, self.destination());
        Action::Notify(Signal::Relayed)
    }

    /// A send or receive failed.
    pub fn on_io_error(&mut self, err: &io::Error) -> Action {
        self.on_fault(fault::classify_io(err))
    }

    /// A classified fault while listening.
    pub fn on_fault(&mut self, fault: Fault) -> Action {
        if self.state != State::Listening {
            return self.unexpected("on_fault");
        }
        if fault.needs_restart() {
            tracing::error!("{}", fault);
            self.state = State::FaultBackoff;
            Action::Backoff(fault)
        } else {
            tracing::debug!("{}; continuing", fault);
            Action::Receive
        }
    }

    /// Settle delay over and signal shown.
    pub fn on_backoff_elapsed(&mut self, fault: Fault) -> Action {
        if self.state != State::FaultBackoff {
            return self.unexpected("on_backoff_elapsed");
        }
        self.restart(fault, false)
    }

    fn restart(&mut self, fault: Fault, settle: bool) -> Action {
        tracing::warn!("{}; restarting", fault);
        self.state = State::Restart;
        Action::Restart { fault, settle }
    }

    // An event the current state has no edge for is a host bug. Fail safe: restart.
    fn unexpected(&mut self, event: &str) -> Action {
        let fault = Fault::Unclassified(format!("{event} in state {:?}", self.state));
        self.restart(fault, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::DisruptiveKind;

    fn sender() -> SocketAddr {
        "192.168.1.20:40000".parse().unwrap()
    }

    fn target() -> RelayTarget {
        RelayTarget::new(
            "192.168.1.255".parse().unwrap(),
            9,
            MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap(),
        )
    }

    fn listening(mode: TriggerMode, own: Option<MacAddress>) -> RelayCore {
        let mut core = RelayCore::new(target(), mode);
        assert_eq!(core.boot(false), Action::Connect);
        assert_eq!(core.on_connected(own), Action::Receive);
        assert_eq!(core.state(), State::Listening);
        core
    }

    #[test]
    fn boot_into_maintenance_pause() {
        let mut core = RelayCore::new(target(), TriggerMode::AcceptAny);
        assert_eq!(core.boot(true), Action::Pause(Signal::Paused));
        assert_eq!(core.state(), State::MaintenancePause);
    }

    #[test]
    fn connect_failures_restart_with_distinct_signals() {
        for (stage, signal) in [
            (ConnectStage::Join, Signal::ConnectFailure),
            (ConnectStage::Bind, Signal::SocketSetupFailure),
        ] {
            let mut core = RelayCore::new(target(), TriggerMode::AcceptAny);
            core.boot(false);
            let action = core.on_connect_failed(stage);
            match action {
                Action::Restart { fault, settle } => {
                    assert!(settle);
                    assert_eq!(fault.signal(), Some(signal));
                }
                other => panic!("expected Restart, got {other:?}"),
            }
            assert_eq!(core.state(), State::Restart);
        }
    }

    #[test]
    fn outbound_packet_is_computed_once_from_target() {
        let mut core = listening(TriggerMode::AcceptAny, None);
        let first = *core.outbound();
        assert_eq!(first, wire::encode(&target().mac));
        for _ in 0..10 {
            let inbound = wire::encode(&MacAddress::new([1, 1, 1, 1, 1, 1]));
            assert_eq!(
                core.on_datagram(inbound.as_bytes(), 102, sender()),
                Action::Relay
            );
            assert_eq!(core.on_sent(), Action::Notify(Signal::Relayed));
            assert_eq!(*core.outbound(), first);
        }
        assert_eq!(core.destination().to_string(), "192.168.1.255:9");
    }

    #[test]
    fn many_timeouts_are_equivalent_to_one() {
        let mut core = listening(TriggerMode::AcceptAny, None);
        for _ in 0..1000 {
            assert_eq!(core.on_timeout(), Action::Receive);
            assert_eq!(
                core.on_io_error(&io::Error::from(io::ErrorKind::WouldBlock)),
                Action::Receive
            );
            assert_eq!(
                core.on_io_error(&io::Error::from(io::ErrorKind::TimedOut)),
                Action::Receive
            );
            assert_eq!(core.state(), State::Listening);
        }
    }

    #[test]
    fn disruptive_fault_backs_off_then_restarts_once() {
        let mut core = listening(TriggerMode::AcceptAny, None);
        let reset = io::Error::from_raw_os_error(104);
        let fault = match core.on_io_error(&reset) {
            Action::Backoff(f) => f,
            other => panic!("expected Backoff, got {other:?}"),
        };
        assert_eq!(fault, Fault::Disruptive(DisruptiveKind::ConnectionReset));
        assert_eq!(core.state(), State::FaultBackoff);
        assert_eq!(
            core.on_backoff_elapsed(fault.clone()),
            Action::Restart {
                fault,
                settle: false
            }
        );
        assert_eq!(core.state(), State::Restart);
    }

    #[test]
    fn fault_response_ignores_history() {
        // A fresh core after each restart answers the same fault the same way.
        let mut seen = Vec::new();
        for _ in 0..5 {
            let mut core = listening(TriggerMode::AcceptAny, None);
            for _ in 0..3 {
                core.on_timeout();
            }
            seen.push(core.on_io_error(&io::Error::from_raw_os_error(113)));
        }
        assert!(seen.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(
            seen[0],
            Action::Backoff(Fault::Disruptive(DisruptiveKind::HostUnreachable))
        );
    }

    #[test]
    fn unknown_fault_is_never_swallowed() {
        let mut core = listening(TriggerMode::AcceptAny, None);
        let action = core.on_io_error(&io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(matches!(action, Action::Backoff(Fault::Unclassified(_))));
        assert_eq!(core.state(), State::FaultBackoff);
    }

    #[test]
    fn link_lost_restarts_after_settle() {
        let mut core = listening(TriggerMode::AcceptAny, None);
        assert_eq!(core.on_connectivity(true), Action::Receive);
        assert_eq!(
            core.on_connectivity(false),
            Action::Restart {
                fault: Fault::Connectivity(ConnectStage::LinkLost),
                settle: true
            }
        );
    }

    #[test]
    fn foreign_and_invalid_datagrams_keep_listening() {
        let own = MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap();
        let mut core = listening(TriggerMode::MatchSelf, Some(own));

        let foreign = wire::encode(&MacAddress::parse("11:22:33:44:55:66").unwrap());
        assert_eq!(
            core.on_datagram(foreign.as_bytes(), 102, sender()),
            Action::Notify(Signal::ForeignTargetIgnored)
        );
        assert_eq!(core.state(), State::Listening);

        let short = [0xFFu8; 60];
        assert_eq!(core.on_datagram(&short, 60, sender()), Action::Receive);
        assert_eq!(core.state(), State::Listening);

        let mine = wire::encode(&own);
        assert_eq!(
            core.on_datagram(mine.as_bytes(), 102, sender()),
            Action::Relay
        );
    }

    #[test]
    fn match_self_without_own_address_is_a_failed_join() {
        let mut core = RelayCore::new(target(), TriggerMode::MatchSelf);
        core.boot(false);
        assert_eq!(
            core.on_connected(None),
            Action::Restart {
                fault: Fault::Connectivity(ConnectStage::Join),
                settle: true
            }
        );
        assert_eq!(core.policy(), None);
    }

    #[test]
    fn events_out_of_order_fail_safe() {
        let mut core = RelayCore::new(target(), TriggerMode::AcceptAny);
        let action = core.on_timeout();
        assert!(matches!(
            action,
            Action::Restart {
                fault: Fault::Unclassified(_),
                settle: true
            }
        ));
        assert_eq!(core.state(), State::Restart);
    }
}
