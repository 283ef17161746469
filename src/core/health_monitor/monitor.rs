//! Health monitor state machine.
//!
//! [`HealthMonitor`] owns the unit inventory and the last verdict. It is
//! driven either synchronously (`refresh_blocking`, used by one-shot CLI
//! commands) or by the async actor in `runtime`, which serializes every
//! trigger and inventory event through it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::aggregator::{evaluate, HealthVerdict};
use super::alerts::{status_message, Alert, Notifier};
use super::inventory::UnitInventory;
use super::unit::{StorageUnit, UnitId, UnitIdentity, UnitSnapshot};
use crate::error::{DiskWatchError, Result};

pub const DEFAULT_INTERVAL_MINUTES: u32 = 30;
pub const DEFAULT_ICON_HEALTHY: &str = "drive-harddisk";
pub const DEFAULT_ICON_FAILING: &str = "dialog-warning";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// User-adjustable monitor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub interval_minutes: u32,
    pub notify_enabled: bool,
    pub icon_healthy: String,
    pub icon_failing: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            notify_enabled: true,
            icon_healthy: DEFAULT_ICON_HEALTHY.to_string(),
            icon_failing: DEFAULT_ICON_FAILING.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorPhase {
    #[default]
    Idle,
    Evaluating,
}

/// Structural and verdict changes, in the order they happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    UnitInserted { index: usize },
    UnitRemoved { index: usize },
    VerdictChanged { failing: bool },
}

/// Read-only view of the monitor for presentation layers
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorSnapshot {
    pub failing: bool,
    pub status: String,
    pub failing_units: Vec<UnitIdentity>,
    pub units: Vec<UnitSnapshot>,
    pub settings: MonitorSettings,
    pub phase: MonitorPhase,
    pub completed_cycles: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// Outcome of refreshing one unit during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub unit: UnitId,
    pub succeeded: bool,
}

pub struct HealthMonitor {
    inventory: UnitInventory,
    settings: MonitorSettings,
    last_verdict: HealthVerdict,
    phase: MonitorPhase,
    completed_cycles: u64,
    last_cycle_at: Option<DateTime<Utc>>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<MonitorEvent>,
}

impl HealthMonitor {
    pub fn new(
        units: Vec<Arc<StorageUnit>>,
        settings: MonitorSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        validate_interval(settings.interval_minutes)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            inventory: UnitInventory::from_units(units),
            settings,
            last_verdict: HealthVerdict::healthy(),
            phase: MonitorPhase::Idle,
            completed_cycles: 0,
            last_cycle_at: None,
            notifier,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<MonitorEvent> {
        self.events.clone()
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn set_interval_minutes(&mut self, minutes: u32) -> Result<()> {
        validate_interval(minutes)?;
        self.settings.interval_minutes = minutes;
        Ok(())
    }

    pub fn set_notify_enabled(&mut self, enabled: bool) {
        self.settings.notify_enabled = enabled;
    }

    pub fn set_icon_healthy<S: Into<String>>(&mut self, icon: S) {
        self.settings.icon_healthy = icon.into();
    }

    pub fn set_icon_failing<S: Into<String>>(&mut self, icon: S) {
        self.settings.icon_failing = icon.into();
    }

    pub fn failing(&self) -> bool {
        self.last_verdict.failing()
    }

    /// Summary of the most recent evaluation
    pub fn status(&self) -> String {
        status_message(&self.last_verdict)
    }

    pub fn verdict(&self) -> &HealthVerdict {
        &self.last_verdict
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn inventory(&self) -> &UnitInventory {
        &self.inventory
    }

    pub fn units(&self) -> Vec<UnitSnapshot> {
        self.inventory.snapshots()
    }

    /// Add a unit reported by the backend and evaluate that unit alone,
    /// so a failing unit is reported without waiting for the next tick.
    /// The next cycle aggregates the whole inventory again.
    ///
    /// Returns the insertion index, or `None` for an already known unit.
    pub fn unit_added(&mut self, unit: Arc<StorageUnit>) -> Option<usize> {
        let id = unit.id().clone();
        let Some(index) = self.inventory.push(unit) else {
            log::debug!("Ignoring duplicate storage unit {}", id);
            return None;
        };

        log::info!("Storage unit added: {} (row {})", id, index);
        self.emit(MonitorEvent::UnitInserted { index });

        let added = self.inventory.snapshots().swap_remove(index);
        self.apply_verdict(evaluate([&added]));
        Some(index)
    }

    /// Drop a unit the backend no longer reports and re-evaluate the
    /// remaining inventory.
    pub fn unit_removed(&mut self, id: &UnitId) -> Result<usize> {
        let index = self
            .inventory
            .position(id)
            .ok_or_else(|| DiskWatchError::unknown_unit(id.as_str()))?;

        log::info!("Storage unit removed: {} (row {})", id, index);
        self.emit(MonitorEvent::UnitRemoved { index });
        self.inventory.remove_at(index);
        self.evaluate();
        Ok(index)
    }

    /// Enter the evaluating phase and return the units to refresh.
    pub fn begin_cycle(&mut self) -> Vec<Arc<StorageUnit>> {
        self.phase = MonitorPhase::Evaluating;
        self.inventory.units()
    }

    /// Record the refresh outcomes, evaluate and return to idle.
    ///
    /// Returns true if the verdict changed.
    pub fn finish_cycle(&mut self, outcomes: &[RefreshOutcome]) -> bool {
        for outcome in outcomes {
            self.inventory.mark_refreshed(&outcome.unit, outcome.succeeded);
        }

        let changed = self.evaluate();
        self.completed_cycles += 1;
        self.last_cycle_at = Some(Utc::now());
        self.phase = MonitorPhase::Idle;
        changed
    }

    /// Run one full cycle on the current thread, refreshing units one after
    /// another.
    pub fn refresh_blocking(&mut self) -> bool {
        let outcomes: Vec<RefreshOutcome> = self
            .begin_cycle()
            .iter()
            .map(|unit| {
                let result = unit.update();
                if let Err(e) = &result {
                    log::warn!("Status of {} unknown for this cycle: {}", unit.id(), e);
                }
                RefreshOutcome {
                    unit: unit.id().clone(),
                    succeeded: result.is_ok(),
                }
            })
            .collect();

        self.finish_cycle(&outcomes)
    }

    /// Aggregate the whole inventory and apply the verdict.
    pub fn evaluate(&mut self) -> bool {
        let verdict = evaluate(&self.inventory.snapshots());
        self.apply_verdict(verdict)
    }

    fn apply_verdict(&mut self, verdict: HealthVerdict) -> bool {
        let changed = verdict.failing() != self.last_verdict.failing();
        self.last_verdict = verdict;

        if !changed {
            return false;
        }

        let failing = self.last_verdict.failing();
        log::info!("Changing failing status to {}", failing);
        self.emit(MonitorEvent::VerdictChanged { failing });

        if self.settings.notify_enabled {
            let alert = Alert::for_verdict(
                &self.last_verdict,
                &self.settings.icon_healthy,
                &self.settings.icon_failing,
            );
            if let Err(e) = self.notifier.notify(&alert) {
                log::error!("Failed to deliver {} alert: {}", alert.kind.as_str(), e);
            }
        }

        true
    }

    /// Look up a unit eligible for a SMART self-test.
    pub fn self_test_target(&self, id: &UnitId) -> Result<Arc<StorageUnit>> {
        let unit = self
            .inventory
            .get(id)
            .ok_or_else(|| DiskWatchError::invalid_command(format!("no storage unit {}", id)))?;
        ensure_self_test_allowed(unit)?;
        Ok(Arc::clone(unit))
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            failing: self.failing(),
            status: self.status(),
            failing_units: self.last_verdict.failing_units().to_vec(),
            units: self.units(),
            settings: self.settings.clone(),
            phase: self.phase,
            completed_cycles: self.completed_cycles,
            last_cycle_at: self.last_cycle_at,
        }
    }

    fn emit(&self, event: MonitorEvent) {
        // send() only fails if there are no subscribers (which is fine)
        let _ = self.events.send(event);
    }
}

/// A self-test needs a drive with SMART supported and enabled.
pub fn ensure_self_test_allowed(unit: &StorageUnit) -> Result<()> {
    match unit.status().kind.drive_capabilities() {
        Some(caps) if caps.allows_self_test() => Ok(()),
        Some(_) => Err(DiskWatchError::invalid_command(format!(
            "SMART is not supported or not enabled on {}",
            unit.id()
        ))),
        None => Err(DiskWatchError::invalid_command(format!(
            "{} is not a drive",
            unit.id()
        ))),
    }
}

pub fn validate_interval(minutes: u32) -> Result<()> {
    if minutes == 0 {
        return Err(DiskWatchError::InvalidInterval(minutes));
    }
    Ok(())
}
