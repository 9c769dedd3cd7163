//! wol-relay: listen for Wake-on-LAN magic packets and relay them to one configured machine.

mod config;
mod indicator;
mod listener;
mod network;
mod relay;
mod restart;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wol_core::{Fault, RelayCore};

use config::Settings;
use indicator::LedIndicator;
use listener::Timing;
use network::SysNetwork;

/// Wake-on-LAN relay daemon
#[derive(Parser)]
#[command(name = "wol-relay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (default: ~/.config/wol-relay/config.toml, then /etc/wol-relay/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log filter directives, e.g. "wol_linux=trace"; overrides --verbose and RUST_LOG
    #[arg(long, value_name = "DIRECTIVES")]
    log_filter: Option<String>,

    /// Validate configuration, print the resolved settings and exit
    #[arg(long)]
    check: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(fault) => {
            tracing::error!("{} ({:?}); not starting", fault, fault.class());
            std::process::exit(restart::EXIT_CONFIG);
        }
    };

    if cli.check {
        return print_check(&settings);
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    let outcome = rt.block_on(async {
        tokio::select! {
            fault = run(&settings) => Ok::<_, anyhow::Error>(Some(fault)),
            res = shutdown_signal() => res.map(|()| None),
        }
    })?;
    drop(rt);

    match outcome {
        Some(fault) => {
            tracing::warn!("session ended: {} ({:?})", fault, fault.class());
            restart::restart()
        }
        None => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}

/// Load and validate configuration. Any error is `ConfigInvalid`: no networking, no restart.
fn load_settings(explicit: Option<&Path>) -> Result<Settings, Fault> {
    config::load(explicit)
        .and_then(|c| c.validate())
        .map_err(|e| Fault::ConfigInvalid(e.to_string()))
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = match &cli.log_filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter {directives:?}"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" })),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn print_check(settings: &Settings) -> anyhow::Result<()> {
    let core = RelayCore::new(settings.target, settings.policy);
    print!("{}", toml::to_string(settings).context("serializing settings")?);
    let bytes = core.outbound().as_bytes();
    println!();
    println!("# outbound packet: {} bytes to {}", bytes.len(), core.destination());
    println!("# header {}", hex::encode(&bytes[..6]));
    println!("# first repetition {}", hex::encode(&bytes[6..12]));
    Ok(())
}

/// One life of the relay. Returns the fault that ended it.
async fn run(settings: &Settings) -> Fault {
    let maintenance = settings.pause_on_maintenance && settings.maintenance_file.exists();
    let mut core = RelayCore::new(settings.target, settings.policy);
    let mut net = SysNetwork::new(settings.interface.clone());
    let mut led = match settings.led.as_deref() {
        Some(name) => LedIndicator::sysfs(name),
        None => LedIndicator::log_only(),
    };
    let timing = Timing {
        receive_timeout: settings.receive_timeout,
        settle_delay: settings.settle_delay,
    };
    listener::run_session(
        &mut core,
        &mut net,
        &mut led,
        settings.listen_port,
        timing,
        maintenance,
    )
    .await
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
