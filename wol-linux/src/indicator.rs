//! Status indicator: log every signal and, when configured, blink a sysfs LED.
//! Indicator failures are never fatal.

use std::path::{Path, PathBuf};

use tokio::time::sleep;
use wol_core::Signal;

const SYSFS_LEDS: &str = "/sys/class/leds";

pub trait Indicator {
    /// Render one signal. Returns when the pattern has finished.
    async fn show(&mut self, signal: Signal);
}

/// Single-colour LED driven through `/sys/class/leds/<name>/brightness`.
/// Colour cannot be shown, so signals are told apart by count and period.
pub struct LedIndicator {
    brightness: Option<PathBuf>,
}

impl LedIndicator {
    /// Log-only indicator.
    pub fn log_only() -> Self {
        Self { brightness: None }
    }

    pub fn sysfs(name: &str) -> Self {
        Self::with_path(Path::new(SYSFS_LEDS).join(name).join("brightness"))
    }

    pub fn with_path(brightness: PathBuf) -> Self {
        Self {
            brightness: Some(brightness),
        }
    }

    fn set(&self, path: &Path, on: bool) -> bool {
        match std::fs::write(path, if on { "1" } else { "0" }) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("LED write to {} failed: {}", path.display(), e);
                false
            }
        }
    }
}

impl Indicator for LedIndicator {
    async fn show(&mut self, signal: Signal) {
        let pattern = signal.pattern();
        tracing::debug!(
            "signal {}: {:?} x{} every {:?}",
            signal,
            pattern.color,
            pattern.count,
            pattern.period
        );
        let Some(path) = self.brightness.clone() else {
            return;
        };
        for _ in 0..pattern.count {
            if !self.set(&path, true) {
                return;
            }
            sleep(pattern.period).await;
            self.set(&path, false);
            sleep(pattern.period).await;
        }
    }
}
