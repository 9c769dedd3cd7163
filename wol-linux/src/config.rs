//! Load config from file and environment, then validate into typed settings.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wol_core::{MacAddress, RelayTarget, TriggerMode, DEFAULT_PORT};

/// Relay configuration. File: ~/.config/wol-relay/config.toml or /etc/wol-relay/config.toml.
/// Env overrides: WOL_RELAY_TARGET_MAC, WOL_RELAY_TARGET_IP, WOL_RELAY_PORT,
/// WOL_RELAY_LISTEN_PORT, WOL_RELAY_INTERFACE, WOL_RELAY_POLICY, WOL_RELAY_PAUSE_ON_MAINTENANCE.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// MAC address of the machine to wake.
    #[serde(default = "default_target_mac")]
    pub target_mac: String,
    /// Where to send the packet, usually the subnet broadcast address.
    #[serde(default = "default_target_ip")]
    pub target_ip: String,
    /// Destination UDP port (default 9).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen port; defaults to `port`.
    #[serde(default)]
    pub listen_port: Option<u16>,
    #[serde(default)]
    pub policy: TriggerMode,
    /// Interface to watch for link state and take the own MAC address from.
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default = "default_true")]
    pub pause_on_maintenance: bool,
    /// While this file exists at boot (and pausing is enabled) the relay stays parked.
    #[serde(default = "default_maintenance_file")]
    pub maintenance_file: PathBuf,
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
    /// LED under /sys/class/leds to blink; log only when absent.
    #[serde(default)]
    pub led: Option<String>,
}

fn default_target_mac() -> String {
    "AA:BB:CC:DD:EE:FF".to_string()
}
fn default_target_ip() -> String {
    "192.168.1.255".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_true() -> bool {
    true
}
fn default_maintenance_file() -> PathBuf {
    PathBuf::from("/run/wol-relay/maintenance")
}
fn default_receive_timeout_ms() -> u64 {
    1000
}
fn default_settle_delay_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_mac: default_target_mac(),
            target_ip: default_target_ip(),
            port: default_port(),
            listen_port: None,
            policy: TriggerMode::default(),
            interface: None,
            pause_on_maintenance: default_true(),
            maintenance_file: default_maintenance_file(),
            receive_timeout_ms: default_receive_timeout_ms(),
            settle_delay_secs: default_settle_delay_secs(),
            led: None,
        }
    }
}

/// Validated settings the relay runs with.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub listen_port: u16,
    pub policy: TriggerMode,
    pub interface: Option<String>,
    pub pause_on_maintenance: bool,
    pub maintenance_file: PathBuf,
    #[serde(with = "millis")]
    pub receive_timeout: Duration,
    #[serde(with = "millis")]
    pub settle_delay: Duration,
    pub led: Option<String>,
    // Last: TOML wants tables after plain values.
    pub target: RelayTarget,
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;
    pub fn serialize<S: Serializer>(v: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(v.as_millis() as u64)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("environment variable {name}: {message}")]
    Env { name: &'static str, message: String },
    #[error(transparent)]
    Mac(#[from] wol_core::MacParseError),
    #[error("invalid target IP address {0:?}")]
    TargetIp(String),
    #[error("{0}")]
    Invalid(String),
}

impl Config {
    /// Check field values and build the typed settings. Any error here is fatal.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let mac = MacAddress::parse(&self.target_mac)?;
        let ip: IpAddr = self
            .target_ip
            .trim()
            .parse()
            .map_err(|_| ConfigError::TargetIp(self.target_ip.clone()))?;
        // The listening socket is IPv4; it cannot send anywhere else.
        if !ip.is_ipv4() {
            return Err(ConfigError::TargetIp(self.target_ip.clone()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".into()));
        }
        if self.receive_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "receive_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.policy == TriggerMode::MatchSelf && self.interface.is_none() {
            return Err(ConfigError::Invalid(
                "policy \"match-self\" needs `interface` to read the own MAC address from".into(),
            ));
        }
        Ok(Settings {
            listen_port: self.listen_port.unwrap_or(self.port),
            policy: self.policy,
            interface: self.interface.clone(),
            pause_on_maintenance: self.pause_on_maintenance,
            maintenance_file: self.maintenance_file.clone(),
            receive_timeout: Duration::from_millis(self.receive_timeout_ms),
            settle_delay: Duration::from_secs(self.settle_delay_secs),
            led: self.led.clone(),
            target: RelayTarget::new(ip, self.port, mac),
        })
    }
}

/// Load config: explicit path (must exist), else the first standard path present, else
/// defaults; then environment overrides.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut c = match explicit {
        Some(p) => load_file(p)?,
        None => match config_paths().into_iter().find(|p| p.exists()) {
            Some(p) => load_file(&p)?,
            None => Config::default(),
        },
    };
    apply_env(&mut c, |name| std::env::var(name).ok())?;
    Ok(c)
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/wol-relay/config.toml"));
    }
    out.push(PathBuf::from("/etc/wol-relay/config.toml"));
    out
}

fn load_file(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<Config>(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env(
    c: &mut Config,
    var: impl Fn(&'static str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(s) = var("WOL_RELAY_TARGET_MAC") {
        c.target_mac = s;
    }
    if let Some(s) = var("WOL_RELAY_TARGET_IP") {
        c.target_ip = s;
    }
    if let Some(s) = var("WOL_RELAY_PORT") {
        c.port = parse_env("WOL_RELAY_PORT", &s)?;
    }
    if let Some(s) = var("WOL_RELAY_LISTEN_PORT") {
        c.listen_port = Some(parse_env("WOL_RELAY_LISTEN_PORT", &s)?);
    }
    if let Some(s) = var("WOL_RELAY_INTERFACE") {
        c.interface = Some(s).filter(|s| !s.is_empty());
    }
    if let Some(s) = var("WOL_RELAY_POLICY") {
        c.policy = parse_env("WOL_RELAY_POLICY", &s)?;
    }
    if let Some(s) = var("WOL_RELAY_PAUSE_ON_MAINTENANCE") {
        c.pause_on_maintenance = parse_env("WOL_RELAY_PAUSE_ON_MAINTENANCE", &s)?;
    }
    Ok(())
}

fn parse_env<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        name,
        message: e.to_string(),
    })
}
