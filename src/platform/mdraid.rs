//! Linux software RAID (md) arrays read from sysfs.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::health_monitor::{UnitProbe, UnitStatus};
use crate::error::{DiskWatchError, Result};

static MD_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^md\d+$").expect("valid md regex"));

/// States in which the array no longer serves data
const BROKEN_STATES: &[&str] = &["inactive", "broken"];

/// An md array found under `/sys/block`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdArray {
    pub name: String,
    pub level: Option<String>,
}

impl MdArray {
    pub fn device(&self) -> String {
        format!("/dev/{}", self.name)
    }

    pub fn display_name(&self) -> String {
        match &self.level {
            Some(level) => format!("{} array {}", level.to_uppercase(), self.name),
            None => format!("RAID array {}", self.name),
        }
    }
}

/// List md arrays, sorted by name.
pub fn scan_arrays(sys_block: &Path) -> Result<Vec<MdArray>> {
    let entries = match fs::read_dir(sys_block) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut arrays: Vec<MdArray> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| MD_NAME.is_match(name))
        .filter(|name| sys_block.join(name).join("md").is_dir())
        .map(|name| MdArray {
            level: read_attribute(&sys_block.join(&name), "level"),
            name,
        })
        .collect();

    arrays.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(arrays)
}

fn read_attribute(array_dir: &Path, attribute: &str) -> Option<String> {
    fs::read_to_string(array_dir.join("md").join(attribute))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read an array's health.
///
/// Arrays without redundancy have no `degraded` attribute; their status is
/// unknown unless the array state itself is broken.
pub fn read_status(array_dir: &Path) -> Result<UnitStatus> {
    let state = read_attribute(array_dir, "array_state").ok_or_else(|| {
        DiskWatchError::backend(
            array_dir.display().to_string(),
            "array_state is not readable",
        )
    })?;

    if BROKEN_STATES.contains(&state.as_str()) {
        return Ok(UnitStatus::md_raid(true, true));
    }

    match read_attribute(array_dir, "degraded") {
        Some(degraded) => {
            let missing: u32 = degraded.parse().map_err(|_| {
                DiskWatchError::backend(
                    array_dir.display().to_string(),
                    format!("unexpected degraded value {:?}", degraded),
                )
            })?;
            Ok(UnitStatus::md_raid(missing > 0, true))
        }
        None => Ok(UnitStatus::md_raid(false, false)),
    }
}

pub struct MdRaidProbe {
    array_dir: PathBuf,
}

impl MdRaidProbe {
    pub fn new(sys_block: &Path, name: &str) -> Self {
        Self {
            array_dir: sys_block.join(name),
        }
    }
}

impl UnitProbe for MdRaidProbe {
    fn probe(&self) -> Result<UnitStatus> {
        read_status(&self.array_dir)
    }
}
