//! Receive loop: executes RelayCore actions against the socket, indicator and network.
//! One datagram at a time; the bounded receive is the only wait besides settle and blink.

use std::convert::Infallible;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, timeout, Instant};
use wol_core::{Action, ConnectStage, Fault, RelayCore, Signal};

use crate::indicator::Indicator;
use crate::network::NetworkProvider;
use crate::relay::{self, Datagram};

/// Receive buffer size. Longer datagrams are truncated by the kernel, which is fine:
/// only the first 102 bytes matter.
const RECV_BUFFER_LEN: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub receive_timeout: Duration,
    pub settle_delay: Duration,
}

/// Run one life of the relay, from boot to the fault that ends it. The caller restarts
/// the process afterwards. Never returns while paused for maintenance.
pub async fn run_session<N, I>(
    core: &mut RelayCore,
    net: &mut N,
    indicator: &mut I,
    listen_port: u16,
    timing: Timing,
    maintenance: bool,
) -> Fault
where
    N: NetworkProvider,
    I: Indicator,
{
    let mut socket: Option<N::Socket> = None;
    let mut buf = vec![0u8; RECV_BUFFER_LEN];
    let mut action = core.boot(maintenance);

    loop {
        action = match action {
            Action::Pause(signal) => match pause(indicator, signal).await {},
            Action::Connect => {
                let (next, bound) = connect(core, net, listen_port).await;
                socket = bound;
                next
            }
            Action::Receive => match socket.as_ref() {
                None => core.on_fault(Fault::Unclassified("receive without a socket".into())),
                Some(sock) => match core.on_connectivity(net.is_connected()) {
                    Action::Receive => {
                        match timeout(timing.receive_timeout, sock.recv_from(&mut buf)).await {
                            Err(_) => core.on_timeout(),
                            Ok(Ok((n, from))) => core.on_datagram(&buf, n, from),
                            Ok(Err(e)) => core.on_io_error(&e),
                        }
                    }
                    other => other,
                },
            },
            Action::Relay => match socket.as_ref() {
                None => core.on_fault(Fault::Unclassified("relay without a socket".into())),
                Some(sock) => {
                    let packet = *core.outbound();
                    match relay::relay(sock, &packet, core.destination()).await {
                        Ok(()) => core.on_sent(),
                        Err(e) => core.on_io_error(&e.into_io()),
                    }
                }
            },
            Action::Notify(signal) => {
                indicator.show(signal).await;
                Action::Receive
            }
            Action::Backoff(fault) => {
                settle(indicator, &fault, timing.settle_delay).await;
                core.on_backoff_elapsed(fault)
            }
            Action::Restart { fault, settle: wait } => {
                if wait {
                    settle(indicator, &fault, timing.settle_delay).await;
                }
                return fault;
            }
        };
    }
}

async fn connect<N: NetworkProvider>(
    core: &mut RelayCore,
    net: &mut N,
    listen_port: u16,
) -> (Action, Option<N::Socket>) {
    let own = match net.join() {
        Ok(own) => own,
        Err(e) => {
            tracing::error!("network join failed: {}", e);
            return (core.on_connect_failed(ConnectStage::Join), None);
        }
    };
    match net.bind(listen_port).await {
        Ok(socket) => {
            tracing::info!(
                "targeting {} for device {}",
                core.destination(),
                core.target().mac
            );
            tracing::info!("ready: listening on UDP port {}", listen_port);
            (core.on_connected(own), Some(socket))
        }
        Err(e) => {
            tracing::error!("socket setup failed: {}", e);
            (core.on_connect_failed(ConnectStage::Bind), None)
        }
    }
}

/// Wait the settle delay, then show the fault's signal.
async fn settle<I: Indicator>(indicator: &mut I, fault: &Fault, delay: Duration) {
    sleep(delay).await;
    if let Some(signal) = fault.signal() {
        indicator.show(signal).await;
    }
}

/// Parked for maintenance: repeat the signal until power is removed.
async fn pause<I: Indicator>(indicator: &mut I, signal: Signal) -> Infallible {
    tracing::warn!("maintenance marker present: relay is PAUSED");
    tracing::warn!("remove the marker and restart the service to resume relaying");
    let period = signal.pattern().duration();
    loop {
        let started = Instant::now();
        indicator.show(signal).await;
        sleep_until(started + period).await;
    }
}
