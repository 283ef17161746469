// Blocking evaluation, as used by `diskwatch status`

use std::sync::Arc;

use diskwatch::core::health_monitor::{
    AlertKind, HealthMonitor, LogNotifier, MonitorSettings, UnitStatus,
};

use super::support::{failing_drive, healthy_drive, scripted_unit, RecordingNotifier};

#[test]
fn test_one_shot_check_lists_every_failing_unit() {
    let (sda, _) = scripted_unit("sda", healthy_drive());
    let (sdb, _) = scripted_unit("sdb", failing_drive());
    let (md0, _) = scripted_unit("md0", UnitStatus::md_raid(true, true));

    let settings = MonitorSettings {
        notify_enabled: false,
        ..Default::default()
    };
    let mut monitor = HealthMonitor::new(vec![sda, sdb, md0], settings, Arc::new(LogNotifier)).unwrap();
    assert!(monitor.refresh_blocking());

    let snapshot = monitor.snapshot();
    assert!(snapshot.failing);
    assert_eq!(snapshot.failing_units.len(), 2);
    assert_eq!(
        snapshot.status,
        "The following storage units are in failing state:\nDisk sdb (/dev/sdb)\nDisk md0 (/dev/md0)"
    );
    assert_eq!(snapshot.completed_cycles, 1);
    assert!(snapshot.last_cycle_at.is_some());
}

#[test]
fn test_snapshot_serializes_for_json_output() {
    let (sda, _) = scripted_unit("sda", healthy_drive());
    let mut monitor =
        HealthMonitor::new(vec![sda], MonitorSettings::default(), Arc::new(LogNotifier)).unwrap();
    monitor.refresh_blocking();

    let json = serde_json::to_value(monitor.snapshot()).unwrap();
    assert_eq!(json["failing"], false);
    assert_eq!(json["status"], "Everything looks healthy.");
    assert_eq!(json["phase"], "idle");
    assert_eq!(json["units"][0]["device"], "/dev/sda");
    assert_eq!(json["units"][0]["kind"]["type"], "drive");
    assert_eq!(json["units"][0]["kind"]["smart_enabled"], true);
}

#[test]
fn test_failed_probe_hides_stale_failure() {
    let (sda, probe) = scripted_unit("sda", failing_drive());
    let notifier = Arc::new(RecordingNotifier::default());
    let mut monitor =
        HealthMonitor::new(vec![sda], MonitorSettings::default(), notifier.clone()).unwrap();

    assert!(monitor.refresh_blocking());
    assert!(monitor.failing());

    probe.break_probe();
    assert!(monitor.refresh_blocking());
    assert!(!monitor.failing());
    assert!(!monitor.units()[0].status.failing_known);

    probe.set(failing_drive());
    assert!(monitor.refresh_blocking());
    assert!(monitor.failing());

    let kinds: Vec<AlertKind> = notifier.alerts().iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![AlertKind::Failing, AlertKind::Healthy, AlertKind::Failing]
    );
}
