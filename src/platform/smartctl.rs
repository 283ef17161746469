//! SMART drive access through `smartctl`'s JSON output.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::health_monitor::{DriveCapabilities, UnitProbe, UnitStatus};
use crate::error::{DiskWatchError, Result};

/// smartctl exit status bits for "command line did not parse" and
/// "device open failed"; the JSON body is meaningless when either is set.
const FATAL_EXIT_BITS: i32 = 0b11;

#[derive(Debug, Deserialize)]
struct ScanOutput {
    #[serde(default)]
    devices: Vec<ScanDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanDevice {
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub protocol: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub smart_support: Option<SmartSupport>,
    #[serde(default)]
    pub smart_status: Option<SmartStatus>,
    #[serde(default)]
    smartctl: Option<SmartctlInfo>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SmartSupport {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SmartStatus {
    pub passed: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SmartctlInfo {
    #[serde(default)]
    exit_status: i32,
}

impl HealthReport {
    /// Translate the report into the monitor's status model.
    ///
    /// Drives that report a health verdict without a `smart_support` block
    /// (older NVMe output) are treated as supported and enabled.
    pub fn unit_status(&self, removable: bool) -> UnitStatus {
        let support = self.smart_support.unwrap_or(SmartSupport {
            available: self.smart_status.is_some(),
            enabled: self.smart_status.is_some(),
        });
        let caps = DriveCapabilities {
            smart_supported: support.available,
            smart_enabled: support.enabled,
            removable,
        };

        match self.smart_status {
            Some(status) if caps.allows_self_test() => UnitStatus::drive(caps, !status.passed, true),
            _ => UnitStatus::drive(caps, false, false),
        }
    }
}

/// Runs smartctl for one binary location.
#[derive(Debug, Clone)]
pub struct Smartctl {
    binary: PathBuf,
}

impl Smartctl {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Locate smartctl on the PATH.
    pub fn locate() -> Option<Self> {
        which::which("smartctl").ok().map(Self::new)
    }

    pub fn scan(&self) -> Result<Vec<ScanDevice>> {
        let output = Command::new(&self.binary)
            .args(["--scan", "--json"])
            .output()
            .map_err(|e| DiskWatchError::backend("smartctl", format!("failed to run: {}", e)))?;

        parse_scan(&String::from_utf8_lossy(&output.stdout))
    }

    pub fn health(&self, device: &str) -> Result<HealthReport> {
        let output = Command::new(&self.binary)
            .args(["--json", "-H", "-i", device])
            .output()
            .map_err(|e| DiskWatchError::backend(device, format!("failed to run smartctl: {}", e)))?;

        parse_health(device, &String::from_utf8_lossy(&output.stdout))
    }

    pub fn start_short_self_test(&self, device: &str) -> Result<()> {
        let status = Command::new(&self.binary)
            .args(["-t", "short", device])
            .status()
            .map_err(|e| DiskWatchError::backend(device, format!("failed to run smartctl: {}", e)))?;

        // Non-fatal bits report drive state, not whether the test started.
        match status.code() {
            Some(code) if code & FATAL_EXIT_BITS == 0 => Ok(()),
            _ => Err(DiskWatchError::backend(
                device,
                format!("smartctl refused the self-test ({})", status),
            )),
        }
    }
}

pub fn parse_scan(stdout: &str) -> Result<Vec<ScanDevice>> {
    let scan: ScanOutput = serde_json::from_str(stdout)?;
    Ok(scan.devices)
}

pub fn parse_health(device: &str, stdout: &str) -> Result<HealthReport> {
    let report: HealthReport = serde_json::from_str(stdout)
        .map_err(|e| DiskWatchError::backend(device, format!("unreadable smartctl output: {}", e)))?;

    let exit_status = report.smartctl.as_ref().map_or(0, |info| info.exit_status);
    if exit_status & FATAL_EXIT_BITS != 0 {
        return Err(DiskWatchError::backend(
            device,
            format!("smartctl could not open the device (exit status {})", exit_status),
        ));
    }

    Ok(report)
}

/// `/sys/block/<name>/removable` for the device node's kernel name.
pub fn is_removable(sys_block: &Path, device: &str) -> bool {
    let Some(name) = Path::new(device).file_name() else {
        return false;
    };
    std::fs::read_to_string(sys_block.join(name).join("removable"))
        .map(|s| s.trim() == "1")
        .unwrap_or(false)
}

/// Probe for one SMART capable drive
pub struct SmartctlProbe {
    smartctl: Smartctl,
    device: String,
    sys_block: PathBuf,
}

impl SmartctlProbe {
    pub fn new(smartctl: Smartctl, device: String, sys_block: PathBuf) -> Self {
        Self {
            smartctl,
            device,
            sys_block,
        }
    }
}

impl UnitProbe for SmartctlProbe {
    fn probe(&self) -> Result<UnitStatus> {
        let report = self.smartctl.health(&self.device)?;
        Ok(report.unit_status(is_removable(&self.sys_block, &self.device)))
    }
}
