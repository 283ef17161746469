//! Monitor command handler.
//!
//! Runs the health monitor in the foreground until Ctrl-C.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::core::health_monitor::{
    JsonLinesNotifier, LogNotifier, MonitorEvent, MonitorRuntime, Notifier, StorageBackend,
};
use crate::core::Config;
use crate::platform::{DesktopNotifier, SystemBackend};
use crate::ui::format_event;

/// Execute the monitor command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, matches);
    config.validate()?;

    let notifier_name = matches
        .get_one::<String>("notifier")
        .map(String::as_str)
        .unwrap_or("desktop");
    let quiet = notifier_name == "json";
    let notifier = build_notifier(notifier_name);

    let backend: Arc<dyn StorageBackend> = Arc::new(SystemBackend::new());
    let runtime = MonitorRuntime::new(
        backend,
        notifier,
        config.monitor_settings(),
        config.runtime_options(),
    )
    .context("Failed to start health monitor")?;

    let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    if !quiet {
        println!(
            "{}",
            format!(
                "Monitoring {} storage unit(s) every {} minute(s). Press Ctrl-C to stop.",
                runtime.handle.units().len(),
                config.interval_minutes
            )
            .white()
            .bold()
        );
    }

    let handle = runtime.handle.clone();
    let mut events = handle.subscribe();
    runtime.block_on(async move {
        let stop = tokio::task::spawn_blocking(move || stop_rx.recv());
        tokio::pin!(stop);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        if !quiet {
                            print_event(&event, &handle.status());
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        log::warn!("Missed {} monitor event(s)", missed);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut stop => break,
            }
        }
    });

    runtime.shutdown();
    Ok(())
}

fn apply_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(minutes) = matches.get_one::<u32>("interval") {
        config.interval_minutes = *minutes;
    }
    if matches.get_flag("no-notify") {
        config.notify_enabled = false;
    }
    if let Some(icon) = matches.get_one::<String>("icon-healthy") {
        config.icon_healthy = icon.clone();
    }
    if let Some(icon) = matches.get_one::<String>("icon-failing") {
        config.icon_failing = icon.clone();
    }
}

fn build_notifier(name: &str) -> Arc<dyn Notifier> {
    match name {
        "log" => Arc::new(LogNotifier),
        "json" => Arc::new(JsonLinesNotifier),
        _ => match DesktopNotifier::locate() {
            Some(notifier) => Arc::new(notifier),
            None => {
                log::warn!("notify-send not found, alerts will only be logged");
                Arc::new(LogNotifier)
            }
        },
    }
}

fn print_event(event: &MonitorEvent, status: &str) {
    let line = format_event(event);
    match event {
        MonitorEvent::VerdictChanged { failing: true } => {
            println!("{}", line.red().bold());
            println!("{}", status.red());
        }
        MonitorEvent::VerdictChanged { failing: false } => {
            println!("{}", line.green());
        }
        _ => println!("{}", line.dimmed()),
    }
}
