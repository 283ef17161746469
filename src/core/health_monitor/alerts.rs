//! Alerts raised when the aggregate health verdict changes.
//!
//! Builds the alert payload from a verdict and delivers it through a
//! [`Notifier`]. Desktop delivery lives in `platform::notify`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use super::aggregator::HealthVerdict;
use crate::error::{DiskWatchError, Result};

pub const HEALTHY_TITLE: &str = "Storage units are back to healthy status";
pub const FAILING_TITLE: &str = "Storage units failing";
pub const HEALTHY_MESSAGE: &str = "Everything looks healthy.";
pub const FAILING_MESSAGE: &str = "The following storage units are in failing state:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Failing,
    Healthy,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Failing => "failing",
            AlertKind::Healthy => "healthy",
        }
    }
}

/// One notification, raised once per verdict transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub persistent: bool,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    /// Build the alert announcing `verdict`.
    pub fn for_verdict(verdict: &HealthVerdict, icon_healthy: &str, icon_failing: &str) -> Self {
        let (kind, title, icon) = if verdict.failing() {
            (AlertKind::Failing, FAILING_TITLE, icon_failing)
        } else {
            (AlertKind::Healthy, HEALTHY_TITLE, icon_healthy)
        };

        Self {
            kind,
            title: title.to_string(),
            body: status_message(verdict),
            icon: icon.to_string(),
            persistent: true,
            raised_at: Utc::now(),
        }
    }
}

/// Human summary of a verdict; lists every failing unit, one per line.
pub fn status_message(verdict: &HealthVerdict) -> String {
    if !verdict.failing() {
        return HEALTHY_MESSAGE.to_string();
    }

    let mut message = FAILING_MESSAGE.to_string();
    for unit in verdict.failing_units() {
        message.push('\n');
        message.push_str(&format!("{} ({})", unit.name, unit.device));
    }
    message
}

/// Delivers alerts to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &Alert) -> Result<()>;
}

/// Writes alerts to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, alert: &Alert) -> Result<()> {
        match alert.kind {
            AlertKind::Failing => log::warn!("{}: {}", alert.title, alert.body.replace('\n', "; ")),
            AlertKind::Healthy => log::info!("{}: {}", alert.title, alert.body),
        }
        Ok(())
    }
}

/// Prints one JSON object per alert on stdout (for scripting)
#[derive(Debug, Default)]
pub struct JsonLinesNotifier;

impl Notifier for JsonLinesNotifier {
    fn notify(&self, alert: &Alert) -> Result<()> {
        let line = serde_json::to_string(alert)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout
            .flush()
            .map_err(|e| DiskWatchError::notification(format!("stdout flush failed: {}", e)))
    }
}
