// Fakes shared by the integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use diskwatch::core::health_monitor::{
    Alert, DriveCapabilities, Notifier, StorageBackend, StorageUnit, UnitId, UnitIdentity,
    UnitProbe, UnitStatus,
};
use diskwatch::{DiskWatchError, Result};
use tokio::sync::mpsc;

/// Probe whose answer can be changed while the monitor runs.
/// `None` makes the probe fail.
#[derive(Clone)]
pub struct ScriptedProbe {
    answer: Arc<Mutex<Option<UnitStatus>>>,
}

impl ScriptedProbe {
    pub fn new(status: UnitStatus) -> Self {
        Self {
            answer: Arc::new(Mutex::new(Some(status))),
        }
    }

    pub fn set(&self, status: UnitStatus) {
        *self.answer.lock().unwrap() = Some(status);
    }

    pub fn break_probe(&self) {
        *self.answer.lock().unwrap() = None;
    }
}

impl UnitProbe for ScriptedProbe {
    fn probe(&self) -> Result<UnitStatus> {
        self.answer
            .lock()
            .unwrap()
            .ok_or_else(|| DiskWatchError::backend("fake", "probe unavailable"))
    }
}

/// Probe that takes a while to answer
pub struct SlowProbe {
    pub delay: Duration,
    pub status: UnitStatus,
}

impl UnitProbe for SlowProbe {
    fn probe(&self) -> Result<UnitStatus> {
        std::thread::sleep(self.delay);
        Ok(self.status)
    }
}

/// Call counters shared between a test and its probe
#[derive(Default)]
pub struct CallStats {
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl CallStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of probe calls seen running at the same time
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Probe whose first call hangs for `first_delay`; later calls answer at once.
pub struct StallingProbe {
    pub stats: Arc<CallStats>,
    pub first_delay: Duration,
    pub status: UnitStatus,
}

impl UnitProbe for StallingProbe {
    fn probe(&self) -> Result<UnitStatus> {
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);
        if self.stats.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            std::thread::sleep(self.first_delay);
        }
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        Ok(self.status)
    }
}

pub fn identity(short_name: &str) -> UnitIdentity {
    let device = format!("/dev/{}", short_name);
    UnitIdentity {
        path: UnitId::new(device.clone()),
        name: format!("Disk {}", short_name),
        short_name: short_name.to_string(),
        device,
    }
}

pub fn smart_drive() -> DriveCapabilities {
    DriveCapabilities {
        smart_supported: true,
        smart_enabled: true,
        removable: false,
    }
}

pub fn healthy_drive() -> UnitStatus {
    UnitStatus::drive(smart_drive(), false, true)
}

pub fn failing_drive() -> UnitStatus {
    UnitStatus::drive(smart_drive(), true, true)
}

/// A unit plus the probe steering it
pub fn scripted_unit(short_name: &str, status: UnitStatus) -> (Arc<StorageUnit>, ScriptedProbe) {
    let probe = ScriptedProbe::new(status);
    let unit = Arc::new(StorageUnit::new(
        identity(short_name),
        status,
        Box::new(probe.clone()),
    ));
    (unit, probe)
}

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, alert: &Alert) -> Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Backend serving a mutable unit list and reporting self-test requests
pub struct FakeBackend {
    units: Mutex<Vec<Arc<StorageUnit>>>,
    self_tests: mpsc::UnboundedSender<UnitId>,
}

impl FakeBackend {
    pub fn new(units: Vec<Arc<StorageUnit>>) -> (Self, mpsc::UnboundedReceiver<UnitId>) {
        let (self_tests, rx) = mpsc::unbounded_channel();
        (
            Self {
                units: Mutex::new(units),
                self_tests,
            },
            rx,
        )
    }

    pub fn plug(&self, unit: Arc<StorageUnit>) {
        self.units.lock().unwrap().push(unit);
    }

    pub fn unplug(&self, id: &UnitId) {
        self.units.lock().unwrap().retain(|unit| unit.id() != id);
    }
}

impl StorageBackend for FakeBackend {
    fn list_units(&self) -> Result<Vec<Arc<StorageUnit>>> {
        Ok(self.units.lock().unwrap().clone())
    }

    fn start_drive_self_test(&self, unit: &StorageUnit) -> Result<()> {
        let _ = self.self_tests.send(unit.id().clone());
        Ok(())
    }
}
