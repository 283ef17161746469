//! Boundary to the device backend that discovers and refreshes units.

use std::sync::Arc;

use super::unit::{StorageUnit, UnitId};
use crate::error::Result;

/// Inventory change reported by a backend
#[derive(Debug, Clone)]
pub enum InventoryEvent {
    Added(Arc<StorageUnit>),
    Removed(UnitId),
}

/// Source of storage units.
///
/// One instance is created at startup and shared with the monitor and the
/// discovery task. Calls may block on external I/O.
pub trait StorageBackend: Send + Sync {
    /// Every unit the backend currently considers live, in discovery order.
    fn list_units(&self) -> Result<Vec<Arc<StorageUnit>>>;

    /// Ask the drive to start a SMART self-test. Returns once the command
    /// has been handed to the device, not when the test completes.
    fn start_drive_self_test(&self, unit: &StorageUnit) -> Result<()>;
}
