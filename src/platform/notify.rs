//! Desktop notifications through `notify-send`.

use std::path::PathBuf;
use std::process::Command;

use crate::core::health_monitor::{Alert, AlertKind, Notifier};
use crate::error::{DiskWatchError, Result};

const APP_NAME: &str = "diskwatch";

pub struct DesktopNotifier {
    binary: PathBuf,
}

impl DesktopNotifier {
    /// Locate `notify-send`; `None` if it is not installed.
    pub fn locate() -> Option<Self> {
        which::which("notify-send")
            .ok()
            .map(|binary| Self { binary })
    }
}

/// Command line arguments for one alert
pub fn notify_send_args(alert: &Alert) -> Vec<String> {
    let urgency = match alert.kind {
        AlertKind::Failing => "critical",
        AlertKind::Healthy => "normal",
    };

    let mut args = vec![
        format!("--app-name={}", APP_NAME),
        format!("--icon={}", alert.icon),
        format!("--urgency={}", urgency),
        format!("--category=device.{}", alert.kind.as_str()),
    ];
    if alert.persistent {
        args.push("--expire-time=0".to_string());
    }
    args.push(alert.title.clone());
    args.push(alert.body.clone());
    args
}

impl Notifier for DesktopNotifier {
    fn notify(&self, alert: &Alert) -> Result<()> {
        let status = Command::new(&self.binary)
            .args(notify_send_args(alert))
            .status()
            .map_err(|e| DiskWatchError::notification(format!("failed to run notify-send: {}", e)))?;

        if !status.success() {
            return Err(DiskWatchError::notification(format!(
                "notify-send exited with {}",
                status
            )));
        }
        Ok(())
    }
}
