use chrono::Local;
use colored::*;

use crate::core::health_monitor::{MonitorEvent, MonitorSnapshot, UnitKind, UnitSnapshot};

/// Icon name for a unit row
pub fn unit_icon(unit: &UnitSnapshot) -> &'static str {
    match unit.status.kind {
        UnitKind::Drive(caps) if caps.removable => "drive-removable-media",
        UnitKind::Drive(_) | UnitKind::MdRaid => "drive-harddisk",
    }
}

pub fn unit_kind_label(unit: &UnitSnapshot) -> &'static str {
    match unit.status.kind {
        UnitKind::Drive(caps) if caps.removable => "removable",
        UnitKind::Drive(_) => "drive",
        UnitKind::MdRaid => "raid",
    }
}

/// Plain health label, without colors
pub fn health_label(unit: &UnitSnapshot) -> &'static str {
    if !unit.status.failing_known {
        "unknown"
    } else if unit.status.failing {
        "FAILING"
    } else {
        "healthy"
    }
}

fn colored_health(unit: &UnitSnapshot) -> ColoredString {
    let label = format!("{:<8}", health_label(unit));
    if !unit.status.failing_known {
        label.dimmed()
    } else if unit.status.failing {
        label.red().bold()
    } else {
        label.green()
    }
}

pub fn print_units_table(units: &[UnitSnapshot]) {
    println!("\n{}", "STORAGE UNITS".bold().bright_cyan());
    println!("{}", "=".repeat(80));

    if units.is_empty() {
        println!("{}", "No storage units found.".dimmed());
        return;
    }

    println!(
        "{}",
        format!(
            "{:<14} {:<10} {:<8} {:<6} {}",
            "DEVICE", "KIND", "HEALTH", "SMART", "NAME"
        )
        .dimmed()
    );

    for unit in units {
        let smart = match unit.status.kind.drive_capabilities() {
            Some(caps) if caps.allows_self_test() => "on",
            Some(caps) if caps.smart_supported => "off",
            Some(_) => "n/a",
            None => "-",
        };
        println!(
            "{} {:<10} {} {:<6} {}",
            format!("{:<14}", unit.identity.device).cyan(),
            unit_kind_label(unit),
            colored_health(unit),
            smart,
            unit.identity.name
        );
    }
}

pub fn print_verdict(snapshot: &MonitorSnapshot) {
    println!();
    if snapshot.failing {
        println!("{}", snapshot.status.red().bold());
    } else {
        println!("{}", snapshot.status.green());
    }
}

/// One line describing a monitor event, prefixed with the local time.
pub fn format_event(event: &MonitorEvent) -> String {
    let time = Local::now().format("%Y-%m-%d %H:%M:%S");
    let text = match event {
        MonitorEvent::UnitInserted { index } => format!("unit added at row {}", index),
        MonitorEvent::UnitRemoved { index } => format!("unit removed from row {}", index),
        MonitorEvent::VerdictChanged { failing: true } => "storage units failing".to_string(),
        MonitorEvent::VerdictChanged { failing: false } => "storage units healthy".to_string(),
    };
    format!("[{}] {}", time, text)
}
