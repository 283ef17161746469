//! Reduces a set of unit snapshots to one health verdict.

use serde::Serialize;

use super::unit::{UnitIdentity, UnitSnapshot};

/// Aggregate health at one evaluation instant.
///
/// `failing` is true exactly when `failing_units` is non-empty; the fields
/// are private so only [`evaluate`] and [`HealthVerdict::healthy`] build one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthVerdict {
    failing: bool,
    failing_units: Vec<UnitIdentity>,
}

impl HealthVerdict {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn failing(&self) -> bool {
        self.failing
    }

    pub fn failing_units(&self) -> &[UnitIdentity] {
        &self.failing_units
    }
}

/// Evaluate a set of units. Units with an unknown status count as healthy.
pub fn evaluate<'a, I>(units: I) -> HealthVerdict
where
    I: IntoIterator<Item = &'a UnitSnapshot>,
{
    let failing_units: Vec<UnitIdentity> = units
        .into_iter()
        .filter(|unit| unit.is_failing())
        .map(|unit| unit.identity.clone())
        .collect();

    HealthVerdict {
        failing: !failing_units.is_empty(),
        failing_units,
    }
}
