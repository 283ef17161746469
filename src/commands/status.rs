//! One-shot health check of every storage unit.

use anyhow::{Context, Result};
use clap::ArgMatches;
use std::sync::Arc;

use crate::core::health_monitor::{HealthMonitor, LogNotifier, MonitorSettings, StorageBackend};
use crate::platform::SystemBackend;
use crate::ui::{print_units_table, print_verdict};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let json_output = matches.get_flag("json");

    let backend = SystemBackend::new();
    let units = backend
        .list_units()
        .context("Failed to list storage units")?;

    // A one-off check reports through stdout, not through alerts.
    let settings = MonitorSettings {
        notify_enabled: false,
        ..Default::default()
    };
    let mut monitor = HealthMonitor::new(units, settings, Arc::new(LogNotifier))?;
    monitor.refresh_blocking();
    let snapshot = monitor.snapshot();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_units_table(&snapshot.units);
        print_verdict(&snapshot);
    }

    Ok(())
}
