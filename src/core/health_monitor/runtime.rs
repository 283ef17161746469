//! Tokio runtime and actor driving the health monitor.
//!
//! A single task owns the [`HealthMonitor`]. Ticks, manual refreshes,
//! setting changes and inventory events all go through it, so only one
//! evaluation runs at a time and inventory changes never interleave with a
//! refresh cycle.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::alerts::Notifier;
use super::backend::{InventoryEvent, StorageBackend};
use super::discovery::discovery_task;
use super::monitor::{
    validate_interval, HealthMonitor, MonitorEvent, MonitorSettings, MonitorSnapshot,
    RefreshOutcome,
};
use super::unit::{StorageUnit, UnitId, UnitSnapshot};
use crate::error::{DiskWatchError, Result};

const COMMAND_CHANNEL_CAPACITY: usize = 32;
const INVENTORY_CHANNEL_CAPACITY: usize = 32;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Timing knobs of the monitor task
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Delay before the one-off startup evaluation
    pub startup_delay: Duration,
    /// Upper bound for one unit's refresh; `None` waits indefinitely
    pub unit_timeout: Option<Duration>,
    /// Period of the backend rescan; `None` disables the discovery task
    pub rescan_interval: Option<Duration>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(2),
            unit_timeout: Some(Duration::from_secs(30)),
            rescan_interval: Some(Duration::from_secs(60)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    IntervalMinutes(u32),
    NotifyEnabled(bool),
    IconHealthy(String),
    IconFailing(String),
}

#[derive(Debug)]
enum MonitorCommand {
    Refresh,
    Control(ControlCommand),
}

/// Commands that never start a cycle
#[derive(Debug)]
enum ControlCommand {
    Configure(SettingChange, oneshot::Sender<Result<()>>),
    StartSelfTest(UnitId),
}

/// Cloneable handle to a running monitor task.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    command_tx: mpsc::Sender<MonitorCommand>,
    inventory_tx: mpsc::Sender<InventoryEvent>,
    snapshot_rx: watch::Receiver<Arc<MonitorSnapshot>>,
    events_tx: broadcast::Sender<MonitorEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

impl MonitorHandle {
    /// Latest published state
    pub fn snapshot(&self) -> Arc<MonitorSnapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    /// Receiver that is notified whenever the state changes
    pub fn watch(&self) -> watch::Receiver<Arc<MonitorSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Structural and verdict change events
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events_tx.subscribe()
    }

    /// Sender for backends reporting added and removed units
    pub fn inventory_sender(&self) -> mpsc::Sender<InventoryEvent> {
        self.inventory_tx.clone()
    }

    pub fn failing(&self) -> bool {
        self.snapshot_rx.borrow().failing
    }

    pub fn status(&self) -> String {
        self.snapshot_rx.borrow().status.clone()
    }

    pub fn units(&self) -> Vec<UnitSnapshot> {
        self.snapshot_rx.borrow().units.clone()
    }

    pub fn settings(&self) -> MonitorSettings {
        self.snapshot_rx.borrow().settings.clone()
    }

    pub fn interval_minutes(&self) -> u32 {
        self.snapshot_rx.borrow().settings.interval_minutes
    }

    pub fn notify_enabled(&self) -> bool {
        self.snapshot_rx.borrow().settings.notify_enabled
    }

    pub fn icon_healthy(&self) -> String {
        self.snapshot_rx.borrow().settings.icon_healthy.clone()
    }

    pub fn icon_failing(&self) -> String {
        self.snapshot_rx.borrow().settings.icon_failing.clone()
    }

    /// Request an evaluation. Dropped if one is already running.
    pub async fn refresh(&self) -> Result<()> {
        self.send(MonitorCommand::Refresh).await
    }

    /// Change the refresh interval and restart the periodic schedule.
    pub async fn set_interval_minutes(&self, minutes: u32) -> Result<()> {
        validate_interval(minutes)?;
        self.configure(SettingChange::IntervalMinutes(minutes)).await
    }

    pub async fn set_notify_enabled(&self, enabled: bool) -> Result<()> {
        self.configure(SettingChange::NotifyEnabled(enabled)).await
    }

    pub async fn set_icon_healthy<S: Into<String>>(&self, icon: S) -> Result<()> {
        self.configure(SettingChange::IconHealthy(icon.into())).await
    }

    pub async fn set_icon_failing<S: Into<String>>(&self, icon: S) -> Result<()> {
        self.configure(SettingChange::IconFailing(icon.into())).await
    }

    /// Ask for a SMART self-test. Ignored unless the unit is a drive with
    /// SMART supported and enabled.
    pub async fn start_self_test(&self, id: UnitId) -> Result<()> {
        self.send(MonitorCommand::Control(ControlCommand::StartSelfTest(id)))
            .await
    }

    pub async fn unit_added(&self, unit: Arc<StorageUnit>) -> Result<()> {
        self.inventory_tx
            .send(InventoryEvent::Added(unit))
            .await
            .map_err(|_| DiskWatchError::MonitorStopped)
    }

    pub async fn unit_removed(&self, id: UnitId) -> Result<()> {
        self.inventory_tx
            .send(InventoryEvent::Removed(id))
            .await
            .map_err(|_| DiskWatchError::MonitorStopped)
    }

    /// Wait until at least `cycles` refresh cycles have completed.
    pub async fn wait_for_cycles(&self, cycles: u64) -> Result<Arc<MonitorSnapshot>> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(|snapshot| snapshot.completed_cycles >= cycles)
            .await
            .map_err(|_| DiskWatchError::MonitorStopped)?;
        Ok(Arc::clone(&snapshot))
    }

    /// Stop the trigger sources. A cycle in progress completes first.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub(crate) fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    async fn configure(&self, change: SettingChange) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(MonitorCommand::Control(ControlCommand::Configure(change, ack_tx)))
            .await?;
        ack_rx.await.map_err(|_| DiskWatchError::MonitorStopped)?
    }

    async fn send(&self, command: MonitorCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| DiskWatchError::MonitorStopped)
    }
}

/// Spawn the monitor task on the current tokio runtime.
pub fn spawn_monitor(
    monitor: HealthMonitor,
    backend: Arc<dyn StorageBackend>,
    options: RuntimeOptions,
) -> (MonitorHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (inventory_tx, inventory_rx) = mpsc::channel(INVENTORY_CHANNEL_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(monitor.snapshot()));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let handle = MonitorHandle {
        command_tx,
        inventory_tx,
        snapshot_rx,
        events_tx: monitor.event_sender(),
        shutdown_tx: shutdown_tx.clone(),
    };

    let actor = MonitorActor {
        ticker: periodic_ticker(monitor.settings().interval_minutes),
        monitor,
        backend,
        unit_timeout: options.unit_timeout,
        snapshot_tx,
        last_cycle_end: None,
        stalled: HashMap::new(),
    };

    let join = tokio::spawn(actor.run(
        options.startup_delay,
        command_rx,
        inventory_rx,
        shutdown_tx.subscribe(),
    ));

    (handle, join)
}

/// Owns a tokio runtime hosting the monitor and discovery tasks.
///
/// This is what the CLI uses; library users already inside a runtime can
/// call [`spawn_monitor`] directly.
pub struct MonitorRuntime {
    pub handle: MonitorHandle,
    monitor_task: JoinHandle<()>,
    runtime: tokio::runtime::Runtime,
}

impl MonitorRuntime {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        notifier: Arc<dyn Notifier>,
        settings: MonitorSettings,
        options: RuntimeOptions,
    ) -> anyhow::Result<Self> {
        log::info!("Initializing health monitor runtime");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("diskwatch-worker")
            .build()?;

        let units = backend.list_units()?;
        log::info!("Found {} storage unit(s)", units.len());
        let known: Vec<UnitId> = units.iter().map(|unit| unit.id().clone()).collect();

        let monitor = HealthMonitor::new(units, settings, notifier)?;
        let rescan_interval = options.rescan_interval;

        let (handle, monitor_task) = {
            let _guard = runtime.enter();
            spawn_monitor(monitor, Arc::clone(&backend), options)
        };

        if let Some(period) = rescan_interval {
            runtime.spawn(discovery_task(
                backend,
                known,
                handle.inventory_sender(),
                period,
                handle.shutdown_signal(),
            ));
        }

        Ok(Self {
            handle,
            monitor_task,
            runtime,
        })
    }

    /// Run a future on the monitor's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Stop the monitor, let an in-flight cycle finish, then tear down the
    /// runtime.
    pub fn shutdown(self) {
        log::info!("Shutting down health monitor");
        self.handle.shutdown();
        if let Err(e) = self.runtime.block_on(self.monitor_task) {
            log::error!("Monitor task ended abnormally: {}", e);
        }
        // A hung backend call must not keep the process alive.
        self.runtime.shutdown_timeout(SHUTDOWN_GRACE);
    }
}

struct MonitorActor {
    monitor: HealthMonitor,
    backend: Arc<dyn StorageBackend>,
    unit_timeout: Option<Duration>,
    ticker: Interval,
    snapshot_tx: watch::Sender<Arc<MonitorSnapshot>>,
    last_cycle_end: Option<Instant>,
    /// Refreshes that outlived their timeout and are still running
    stalled: HashMap<UnitId, JoinHandle<Result<()>>>,
}

impl MonitorActor {
    async fn run(
        mut self,
        startup_delay: Duration,
        mut command_rx: mpsc::Receiver<MonitorCommand>,
        mut inventory_rx: mpsc::Receiver<InventoryEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        log::info!(
            "Health monitor started ({} unit(s), every {} minute(s))",
            self.monitor.inventory().len(),
            self.monitor.settings().interval_minutes
        );

        // Lets configuration settle before the first evaluation.
        let startup = tokio::time::sleep(startup_delay);
        tokio::pin!(startup);
        let mut startup_pending = true;

        loop {
            tokio::select! {
                _ = &mut startup, if startup_pending => {
                    startup_pending = false;
                    self.run_cycle("startup", &mut command_rx).await;
                }
                deadline = self.ticker.tick() => {
                    if self.last_cycle_end.is_some_and(|end| deadline < end) {
                        log::debug!("Skipping tick that fell inside the previous cycle");
                        continue;
                    }
                    self.run_cycle("tick", &mut command_rx).await;
                }
                command = command_rx.recv() => match command {
                    Some(MonitorCommand::Refresh) => {
                        self.run_cycle("manual refresh", &mut command_rx).await;
                    }
                    Some(MonitorCommand::Control(command)) => self.handle_command(command),
                    None => break,
                },
                Some(event) = inventory_rx.recv() => self.apply_inventory_event(event),
                _ = shutdown.recv() => break,
            }
        }

        log::info!("Health monitor stopped");
    }

    /// Refresh every unit sequentially, then evaluate.
    async fn run_cycle(
        &mut self,
        trigger: &str,
        command_rx: &mut mpsc::Receiver<MonitorCommand>,
    ) {
        let units = self.monitor.begin_cycle();
        self.publish();
        log::debug!("Refreshing {} storage unit(s) ({})", units.len(), trigger);

        self.stalled.retain(|_, task| !task.is_finished());

        let mut outcomes = Vec::with_capacity(units.len());
        for unit in units {
            let id = unit.id().clone();
            let succeeded = match self.refresh_unit(unit).await {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Status of {} unknown for this cycle: {}", id, e);
                    false
                }
            };
            outcomes.push(RefreshOutcome {
                unit: id,
                succeeded,
            });
        }

        // Taken before the cycle is published: anything sent after that
        // must start a cycle of its own.
        let deferred = take_queued_commands(command_rx);

        self.monitor.finish_cycle(&outcomes);
        self.last_cycle_end = Some(Instant::now());
        self.publish();

        for command in deferred {
            self.handle_command(command);
        }
    }

    /// Refresh one unit off the executor, bounded by the unit timeout.
    ///
    /// A unit whose previous refresh is still running is not refreshed
    /// again until that call returns.
    async fn refresh_unit(&mut self, unit: Arc<StorageUnit>) -> Result<()> {
        let id = unit.id().clone();
        if self.stalled.contains_key(&id) {
            return Err(DiskWatchError::backend(
                id.as_str(),
                "previous refresh is still running",
            ));
        }

        let mut task = tokio::task::spawn_blocking(move || unit.update());
        let joined = match self.unit_timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, &mut task).await;
                match waited {
                    Ok(joined) => joined,
                    Err(_) => {
                        self.stalled.insert(id.clone(), task);
                        return Err(DiskWatchError::unit_timeout(id.as_str(), limit.as_secs()));
                    }
                }
            }
            None => task.await,
        };

        joined.map_err(|e| {
            DiskWatchError::backend(id.as_str(), format!("refresh task failed: {}", e))
        })?
    }

    fn handle_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Configure(change, ack) => {
                let result = self.apply_setting(change);
                self.publish();
                let _ = ack.send(result);
            }
            ControlCommand::StartSelfTest(id) => self.start_self_test(id),
        }
    }

    fn apply_setting(&mut self, change: SettingChange) -> Result<()> {
        match change {
            SettingChange::IntervalMinutes(minutes) => {
                self.monitor.set_interval_minutes(minutes)?;
                self.ticker = periodic_ticker(minutes);
                log::info!("Refresh interval set to {} minute(s)", minutes);
            }
            SettingChange::NotifyEnabled(enabled) => self.monitor.set_notify_enabled(enabled),
            SettingChange::IconHealthy(icon) => self.monitor.set_icon_healthy(icon),
            SettingChange::IconFailing(icon) => self.monitor.set_icon_failing(icon),
        }
        Ok(())
    }

    fn apply_inventory_event(&mut self, event: InventoryEvent) {
        match event {
            InventoryEvent::Added(unit) => {
                self.monitor.unit_added(unit);
            }
            InventoryEvent::Removed(id) => {
                if let Err(e) = self.monitor.unit_removed(&id) {
                    log::debug!("Ignoring removal: {}", e);
                }
            }
        }
        self.publish();
    }

    fn start_self_test(&self, id: UnitId) {
        let unit = match self.monitor.self_test_target(&id) {
            Ok(unit) => unit,
            Err(e) => {
                log::debug!("Ignoring self-test request: {}", e);
                return;
            }
        };

        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || match backend.start_drive_self_test(&unit) {
            Ok(()) => log::info!("Self-test started on {}", unit.id()),
            Err(e) => log::error!("Failed to start self-test on {}: {}", unit.id(), e),
        });
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(Arc::new(self.monitor.snapshot()));
    }
}

/// Remove the commands queued while units were refreshing. Refresh
/// requests are dropped since the finishing cycle covers them.
fn take_queued_commands(
    command_rx: &mut mpsc::Receiver<MonitorCommand>,
) -> Vec<ControlCommand> {
    let mut deferred = Vec::new();
    while let Ok(command) = command_rx.try_recv() {
        match command {
            MonitorCommand::Refresh => log::debug!("Coalescing refresh request"),
            MonitorCommand::Control(command) => deferred.push(command),
        }
    }
    deferred
}

/// First tick one full period from now, like a freshly started timer.
fn periodic_ticker(minutes: u32) -> Interval {
    let period = Duration::from_secs(u64::from(minutes) * 60);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
