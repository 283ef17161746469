//! Storage backend for Linux hosts: SMART drives via smartctl and md
//! arrays via sysfs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::mdraid::{self, MdRaidProbe};
use super::smartctl::{is_removable, Smartctl, SmartctlProbe};
use crate::core::health_monitor::{
    DriveCapabilities, StorageBackend, StorageUnit, UnitId, UnitIdentity, UnitProbe, UnitStatus,
};
use crate::error::{DiskWatchError, Result};

const SYS_BLOCK: &str = "/sys/block";

pub struct SystemBackend {
    smartctl: Option<Smartctl>,
    sys_block: PathBuf,
}

impl SystemBackend {
    pub fn new() -> Self {
        let smartctl = Smartctl::locate();
        if smartctl.is_none() {
            log::warn!("smartctl not found on PATH, only RAID arrays will be monitored");
        }
        Self {
            smartctl,
            sys_block: PathBuf::from(SYS_BLOCK),
        }
    }

    fn drives(&self, smartctl: &Smartctl) -> Result<Vec<Arc<StorageUnit>>> {
        let devices = smartctl.scan()?;
        let units = devices
            .into_iter()
            .map(|device| {
                let probe = SmartctlProbe::new(
                    smartctl.clone(),
                    device.name.clone(),
                    self.sys_block.clone(),
                );
                // An unreadable drive still joins the inventory, with an
                // unknown status.
                let (model, status) = match smartctl.health(&device.name) {
                    Ok(report) => {
                        let removable = is_removable(&self.sys_block, &device.name);
                        (report.model_name.clone(), report.unit_status(removable))
                    }
                    Err(e) => {
                        log::warn!("Could not read {}: {}", device.name, e);
                        let caps = DriveCapabilities {
                            removable: is_removable(&self.sys_block, &device.name),
                            ..Default::default()
                        };
                        (None, UnitStatus::drive(caps, false, false))
                    }
                };

                Arc::new(StorageUnit::new(
                    identity(&device.name, model),
                    status,
                    Box::new(probe),
                ))
            })
            .collect();
        Ok(units)
    }

    fn arrays(&self) -> Result<Vec<Arc<StorageUnit>>> {
        let units = mdraid::scan_arrays(&self.sys_block)?
            .into_iter()
            .map(|array| {
                let probe = MdRaidProbe::new(&self.sys_block, &array.name);
                let status = probe.probe().unwrap_or_else(|e| {
                    log::warn!("Could not read {}: {}", array.name, e);
                    UnitStatus::md_raid(false, false)
                });
                let device = array.device();
                Arc::new(StorageUnit::new(
                    UnitIdentity {
                        path: UnitId::new(device.clone()),
                        name: array.display_name(),
                        short_name: array.name.clone(),
                        device,
                    },
                    status,
                    Box::new(probe),
                ))
            })
            .collect();
        Ok(units)
    }
}

impl Default for SystemBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn identity(device: &str, model: Option<String>) -> UnitIdentity {
    let short_name = Path::new(device)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| device.to_string());

    UnitIdentity {
        path: UnitId::new(device),
        name: model.unwrap_or_else(|| short_name.clone()),
        short_name,
        device: device.to_string(),
    }
}

impl StorageBackend for SystemBackend {
    /// One source failing to list leaves the other's units in place.
    fn list_units(&self) -> Result<Vec<Arc<StorageUnit>>> {
        let mut units = match &self.smartctl {
            Some(smartctl) => self.drives(smartctl).unwrap_or_else(|e| {
                log::warn!("Could not list SMART drives: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        match self.arrays() {
            Ok(arrays) => units.extend(arrays),
            Err(e) => log::warn!("Could not list RAID arrays: {}", e),
        }
        Ok(units)
    }

    fn start_drive_self_test(&self, unit: &StorageUnit) -> Result<()> {
        let smartctl = self
            .smartctl
            .as_ref()
            .ok_or_else(|| DiskWatchError::invalid_command("smartctl is not installed"))?;
        smartctl.start_short_self_test(&unit.identity().device)
    }
}
