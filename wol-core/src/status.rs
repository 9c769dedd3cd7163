//! Status signals: one distinct identity per notable event, with a default blink pattern.
//! How a pattern is rendered (LED, log line, buzzer) is the host's business.

use std::time::Duration;

/// Notable events the relay reports to its indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Parked for maintenance; networking never started.
    Paused,
    /// Could not join the network, or the link went away while listening.
    ConnectFailure,
    /// Could not bind the listening socket.
    SocketSetupFailure,
    /// A magic packet was relayed.
    Relayed,
    /// A valid magic packet for another device was ignored.
    ForeignTargetIgnored,
    /// Recognised disruptive network fault; restarting.
    NetworkFault,
    /// Unrecognised fault; restarting.
    UnknownFault,
}

impl Signal {
    pub const ALL: [Signal; 7] = [
        Signal::Paused,
        Signal::ConnectFailure,
        Signal::SocketSetupFailure,
        Signal::Relayed,
        Signal::ForeignTargetIgnored,
        Signal::NetworkFault,
        Signal::UnknownFault,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Signal::Paused => "paused",
            Signal::ConnectFailure => "connect-failure",
            Signal::SocketSetupFailure => "socket-setup-failure",
            Signal::Relayed => "relayed",
            Signal::ForeignTargetIgnored => "foreign-target-ignored",
            Signal::NetworkFault => "network-fault",
            Signal::UnknownFault => "unknown-fault",
        }
    }

    /// Default rendering. Every signal maps to a different pattern, and stays distinct
    /// when the colour cannot be shown.
    pub fn pattern(&self) -> Pattern {
        let (color, count, period_ms) = match self {
            Signal::Paused => (Color::Yellow, 10, 500),
            Signal::ConnectFailure => (Color::Red, 2, 200),
            Signal::SocketSetupFailure => (Color::Red, 3, 200),
            Signal::Relayed => (Color::Green, 1, 50),
            Signal::ForeignTargetIgnored => (Color::Purple, 2, 50),
            Signal::NetworkFault => (Color::Red, 4, 200),
            Signal::UnknownFault => (Color::Red, 5, 200),
        };
        Pattern {
            color,
            count,
            period: Duration::from_millis(period_ms),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Purple,
}

/// Blink `count` times; each blink is on for `period` then off for `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pattern {
    pub color: Color,
    pub count: u8,
    pub period: Duration,
}

impl Pattern {
    /// Wall time one rendering of the pattern takes.
    pub fn duration(&self) -> Duration {
        self.period * 2 * u32::from(self.count)
    }
}
