//! Storage unit records observed by the health monitor.
//!
//! A [`StorageUnit`] is created by a backend when it discovers a drive or
//! RAID array. The monitor only reads it and asks it to `update()` itself;
//! every field change goes through the unit's [`UnitProbe`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Stable opaque handle of a storage unit (device or backend path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identity fields of a unit; never change for the lifetime of the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitIdentity {
    pub path: UnitId,
    pub name: String,
    pub short_name: String,
    pub device: String,
}

/// SMART capabilities of a drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveCapabilities {
    pub smart_supported: bool,
    pub smart_enabled: bool,
    pub removable: bool,
}

impl DriveCapabilities {
    /// Self-tests need SMART to be both supported and switched on.
    pub fn allows_self_test(&self) -> bool {
        self.smart_supported && self.smart_enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitKind {
    Drive(DriveCapabilities),
    MdRaid,
}

impl UnitKind {
    pub fn is_drive(&self) -> bool {
        matches!(self, UnitKind::Drive(_))
    }

    pub fn drive_capabilities(&self) -> Option<&DriveCapabilities> {
        match self {
            UnitKind::Drive(caps) => Some(caps),
            UnitKind::MdRaid => None,
        }
    }
}

/// Health status reported by the backend. Capability flags travel with the
/// status so a refresh updates them together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatus {
    pub kind: UnitKind,
    pub failing: bool,
    pub failing_known: bool,
}

impl UnitStatus {
    pub fn drive(caps: DriveCapabilities, failing: bool, failing_known: bool) -> Self {
        Self {
            kind: UnitKind::Drive(caps),
            failing,
            failing_known,
        }
    }

    pub fn md_raid(failing: bool, failing_known: bool) -> Self {
        Self {
            kind: UnitKind::MdRaid,
            failing,
            failing_known,
        }
    }

    /// Same status with the failing flag marked indeterminate.
    pub fn as_unknown(mut self) -> Self {
        self.failing_known = false;
        self
    }
}

/// Point-in-time copy of a unit, used for aggregation and presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    #[serde(flatten)]
    pub identity: UnitIdentity,
    #[serde(flatten)]
    pub status: UnitStatus,
}

impl UnitSnapshot {
    pub fn id(&self) -> &UnitId {
        &self.identity.path
    }

    /// Only a known failing status counts towards the verdict.
    pub fn is_failing(&self) -> bool {
        self.status.failing_known && self.status.failing
    }
}

/// Reads the live state of one unit from its backend.
///
/// Implementations may block on I/O; the monitor calls them off the async
/// executor and one unit at a time.
pub trait UnitProbe: Send + Sync {
    fn probe(&self) -> Result<UnitStatus>;
}

/// A monitored drive or RAID array
pub struct StorageUnit {
    identity: UnitIdentity,
    status: RwLock<UnitStatus>,
    probe: Box<dyn UnitProbe>,
}

impl StorageUnit {
    pub fn new(identity: UnitIdentity, status: UnitStatus, probe: Box<dyn UnitProbe>) -> Self {
        Self {
            identity,
            status: RwLock::new(status),
            probe,
        }
    }

    pub fn id(&self) -> &UnitId {
        &self.identity.path
    }

    pub fn identity(&self) -> &UnitIdentity {
        &self.identity
    }

    pub fn status(&self) -> UnitStatus {
        *self.status.read()
    }

    pub fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            identity: self.identity.clone(),
            status: self.status(),
        }
    }

    /// Re-read the unit's status from the backend.
    ///
    /// On error the previous status is kept untouched.
    pub fn update(&self) -> Result<()> {
        let fresh = self.probe.probe()?;
        *self.status.write() = fresh;
        Ok(())
    }
}

impl fmt::Debug for StorageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageUnit")
            .field("identity", &self.identity)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
