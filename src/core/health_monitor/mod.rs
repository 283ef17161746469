//! Storage health monitoring core.
//!
//! Samples drives and RAID arrays, reduces their individual states to one
//! healthy/failing verdict and raises an alert only when that verdict
//! changes.

pub mod aggregator;
pub mod alerts;
pub mod backend;
mod discovery;
pub mod inventory;
mod monitor;
mod runtime;
pub mod unit;

pub use aggregator::{evaluate, HealthVerdict};
pub use alerts::{status_message, Alert, AlertKind, JsonLinesNotifier, LogNotifier, Notifier};
pub use backend::{InventoryEvent, StorageBackend};
pub use discovery::{diff_inventory, discovery_task};
pub use inventory::UnitInventory;
pub use monitor::{
    ensure_self_test_allowed, validate_interval, HealthMonitor, MonitorEvent, MonitorPhase,
    MonitorSettings, MonitorSnapshot, RefreshOutcome, DEFAULT_ICON_FAILING, DEFAULT_ICON_HEALTHY,
    DEFAULT_INTERVAL_MINUTES,
};
pub use runtime::{spawn_monitor, MonitorHandle, MonitorRuntime, RuntimeOptions, SettingChange};
pub use unit::{
    DriveCapabilities, StorageUnit, UnitId, UnitIdentity, UnitKind, UnitProbe, UnitSnapshot,
    UnitStatus,
};
