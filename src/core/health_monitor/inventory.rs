//! Ordered set of the storage units currently known to the monitor.

use std::sync::Arc;

use super::unit::{StorageUnit, UnitId, UnitSnapshot};

/// An inventory slot: the shared unit plus the monitor's own bookkeeping.
#[derive(Debug, Clone)]
struct Entry {
    unit: Arc<StorageUnit>,
    /// Set when the last refresh of this unit failed or timed out.
    refresh_failed: bool,
}

/// Units in discovery order. Indices are stable until a removal shifts the
/// units after it.
#[derive(Debug, Default)]
pub struct UnitInventory {
    entries: Vec<Entry>,
}

impl UnitInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory from a backend listing, skipping duplicate identities.
    pub fn from_units<I>(units: I) -> Self
    where
        I: IntoIterator<Item = Arc<StorageUnit>>,
    {
        let mut inventory = Self::new();
        for unit in units {
            inventory.push(unit);
        }
        inventory
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &UnitId) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: &UnitId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.unit.id() == id)
    }

    pub fn get(&self, id: &UnitId) -> Option<&Arc<StorageUnit>> {
        self.entries
            .iter()
            .find(|entry| entry.unit.id() == id)
            .map(|entry| &entry.unit)
    }

    /// Append a unit. Returns its index, or `None` if the identity is
    /// already present.
    pub fn push(&mut self, unit: Arc<StorageUnit>) -> Option<usize> {
        if self.contains(unit.id()) {
            return None;
        }
        self.entries.push(Entry {
            unit,
            refresh_failed: false,
        });
        Some(self.entries.len() - 1)
    }

    /// Remove the unit at `index`.
    pub fn remove_at(&mut self, index: usize) -> Arc<StorageUnit> {
        self.entries.remove(index).unit
    }

    /// Handles of every unit, in order.
    pub fn units(&self) -> Vec<Arc<StorageUnit>> {
        self.entries.iter().map(|entry| Arc::clone(&entry.unit)).collect()
    }

    /// Record the outcome of a refresh. Units removed in the meantime are
    /// ignored.
    pub fn mark_refreshed(&mut self, id: &UnitId, succeeded: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.unit.id() == id) {
            entry.refresh_failed = !succeeded;
        }
    }

    /// Snapshots for aggregation; a unit whose last refresh failed reports
    /// an unknown status.
    pub fn snapshots(&self) -> Vec<UnitSnapshot> {
        self.entries
            .iter()
            .map(|entry| {
                let mut snapshot = entry.unit.snapshot();
                if entry.refresh_failed {
                    snapshot.status = snapshot.status.as_unknown();
                }
                snapshot
            })
            .collect()
    }
}
