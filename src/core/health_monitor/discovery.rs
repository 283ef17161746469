//! Inventory discovery task.
//!
//! Backends without change notifications are rescanned periodically; the
//! difference between two listings becomes `Added` / `Removed` events.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::backend::{InventoryEvent, StorageBackend};
use super::unit::{StorageUnit, UnitId};

/// Task that rescans the backend and reports inventory changes.
pub async fn discovery_task(
    backend: Arc<dyn StorageBackend>,
    mut known: Vec<UnitId>,
    inventory_tx: mpsc::Sender<InventoryEvent>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    log::debug!("Discovery task started (every {:?})", period);

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let backend = Arc::clone(&backend);
                let listing = match tokio::task::spawn_blocking(move || backend.list_units()).await {
                    Ok(Ok(units)) => units,
                    Ok(Err(e)) => {
                        log::warn!("Storage rescan failed: {}", e);
                        continue;
                    }
                    Err(e) => {
                        log::error!("Storage rescan task failed: {}", e);
                        continue;
                    }
                };

                let (events, current) = diff_inventory(&known, listing);
                known = current;

                for event in events {
                    if inventory_tx.send(event).await.is_err() {
                        log::debug!("Monitor gone, stopping discovery");
                        return;
                    }
                }
            }
            _ = shutdown.recv() => {
                log::debug!("Discovery task shutting down");
                break;
            }
        }
    }
}

/// Compare a fresh listing with the known identities.
///
/// Returns removals (in known order) followed by additions (in listing
/// order), and the identities of the new listing.
pub fn diff_inventory(
    known: &[UnitId],
    listing: Vec<Arc<StorageUnit>>,
) -> (Vec<InventoryEvent>, Vec<UnitId>) {
    let current: Vec<UnitId> = listing.iter().map(|unit| unit.id().clone()).collect();
    let current_set: HashSet<&UnitId> = current.iter().collect();
    let known_set: HashSet<&UnitId> = known.iter().collect();

    let mut events: Vec<InventoryEvent> = known
        .iter()
        .filter(|id| !current_set.contains(id))
        .map(|id| InventoryEvent::Removed(id.clone()))
        .collect();

    events.extend(
        listing
            .into_iter()
            .filter(|unit| !known_set.contains(unit.id()))
            .map(InventoryEvent::Added),
    );

    (events, current)
}
