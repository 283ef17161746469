// Tests for backend rescans feeding the monitor through MonitorRuntime

use std::sync::Arc;
use std::time::Duration;

use diskwatch::core::health_monitor::{
    MonitorEvent, MonitorRuntime, MonitorSettings, RuntimeOptions, UnitId,
};
use tokio::sync::broadcast;
use tokio::time::timeout;

use super::support::{failing_drive, healthy_drive, scripted_unit, FakeBackend, RecordingNotifier};

fn next_event(runtime: &MonitorRuntime, events: &mut broadcast::Receiver<MonitorEvent>) -> MonitorEvent {
    runtime
        .block_on(async { timeout(Duration::from_secs(5), events.recv()).await })
        .expect("event within 5 seconds")
        .unwrap()
}

#[test]
fn test_rescan_reports_plugged_and_unplugged_units() {
    let (sda, _probe) = scripted_unit("sda", healthy_drive());
    let (backend, _self_tests) = FakeBackend::new(vec![sda]);
    let backend = Arc::new(backend);
    let notifier = Arc::new(RecordingNotifier::default());

    let options = RuntimeOptions {
        startup_delay: Duration::ZERO,
        unit_timeout: Some(Duration::from_secs(5)),
        rescan_interval: Some(Duration::from_millis(50)),
    };
    let runtime = MonitorRuntime::new(
        backend.clone(),
        notifier.clone(),
        MonitorSettings::default(),
        options,
    )
    .unwrap();
    let mut events = runtime.handle.subscribe();

    runtime.block_on(runtime.handle.wait_for_cycles(1)).unwrap();
    assert_eq!(runtime.handle.units().len(), 1);

    let (usb, _usb_probe) = scripted_unit("sdb", failing_drive());
    backend.plug(usb);
    assert_eq!(next_event(&runtime, &mut events), MonitorEvent::UnitInserted { index: 1 });
    assert_eq!(
        next_event(&runtime, &mut events),
        MonitorEvent::VerdictChanged { failing: true }
    );
    assert!(runtime.handle.failing());

    backend.unplug(&UnitId::new("/dev/sdb"));
    assert_eq!(next_event(&runtime, &mut events), MonitorEvent::UnitRemoved { index: 1 });
    assert_eq!(
        next_event(&runtime, &mut events),
        MonitorEvent::VerdictChanged { failing: false }
    );

    runtime.shutdown();
    assert_eq!(notifier.alerts().len(), 2);
}

#[test]
fn test_runtime_without_rescans_keeps_initial_inventory() {
    let (sda, _probe) = scripted_unit("sda", healthy_drive());
    let (backend, _self_tests) = FakeBackend::new(vec![sda]);
    let backend = Arc::new(backend);

    let options = RuntimeOptions {
        startup_delay: Duration::ZERO,
        unit_timeout: None,
        rescan_interval: None,
    };
    let runtime = MonitorRuntime::new(
        backend.clone(),
        Arc::new(RecordingNotifier::default()),
        MonitorSettings::default(),
        options,
    )
    .unwrap();
    runtime.block_on(runtime.handle.wait_for_cycles(1)).unwrap();

    let (usb, _usb_probe) = scripted_unit("sdb", healthy_drive());
    backend.plug(usb);
    runtime.block_on(async { tokio::time::sleep(Duration::from_millis(200)).await });
    assert_eq!(runtime.handle.units().len(), 1);

    runtime.shutdown();
}
