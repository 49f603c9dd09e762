//! Telemetry snapshot and its derived fields
//!
//! The derivations here are deliberately pure functions over already-fetched
//! values — they run inside the aggregator's publish step and inside tests
//! without any I/O.

use serde::Serialize;

use crate::types::{
    BlockLevel, Cell, FaultRecord, MachineIdentity, MachineMode, MachinePowerState,
};

/// Consistent point-in-time view of the machine, derived from the latest
/// completed poll of every source.
///
/// Recomputed wholesale on every poll tick or invalidation; never patched
/// field-by-field.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub identity: Option<MachineIdentity>,
    pub mode: Option<MachineMode>,
    pub power: Option<MachinePowerState>,
    /// Active faults, most recent first.
    pub faults: Vec<FaultRecord>,
    /// Percentage of usable cells currently occupied; `None` while the cell
    /// inventory is unknown (distinct from an empty warehouse).
    pub warehouse_fill_percent: Option<f64>,
    pub bay_number: u8,
    pub is_manual_for_this_bay: bool,
    pub is_powered_off: bool,
    pub has_faults: bool,
    /// At least one source's most recent poll failed; its last-known value
    /// is still being served.
    pub has_data_error: bool,
}

impl TelemetrySnapshot {
    pub fn empty(bay_number: u8) -> Self {
        Self {
            bay_number,
            ..Self::default()
        }
    }

    /// The most recent active fault, if any.
    pub fn primary_fault(&self) -> Option<&FaultRecord> {
        self.faults.first()
    }
}

/// Warehouse fill percentage from the cell inventory.
///
/// `locked` cells (block level `Blocked`) are excluded from the usable
/// total. An empty inventory yields `None` — "unknown" is not "empty
/// warehouse". The result is clamped to at most 100 but deliberately not
/// clamped below 0: a negative value means the controller reported more
/// free cells than usable ones, and masking that anomaly would hide a
/// miscounting machine.
pub fn warehouse_fill_percent(cells: &[Cell]) -> Option<f64> {
    if cells.is_empty() {
        return None;
    }
    let total = cells.len() as f64;
    let locked = cells
        .iter()
        .filter(|cell| cell.block_level == BlockLevel::Blocked)
        .count() as f64;
    let free = cells.iter().filter(|cell| cell.is_free).count() as f64;
    let available = total - locked;
    if available <= 0.0 {
        return Some(0.0);
    }
    let fill = 100.0 - (free / available) * 100.0;
    Some(fill.min(100.0))
}

/// Whether `mode` is the manual mode belonging to this bay.
///
/// Manual is bay-indexed (bay 1 → `Manual`, bay 2 → `Manual2`, bay 3 →
/// `Manual3`); other bay numbers compare against the bay-1 value. Absent
/// mode is not manual.
pub fn is_manual_for_bay(mode: Option<MachineMode>, bay_number: u8) -> bool {
    mode.is_some_and(|mode| mode == MachineMode::manual_for_bay(bay_number))
}

/// Whether the machine is powered off.
///
/// Only a defined state other than `Powered`/`PoweringUp` counts: absence
/// of data must not trigger power-off behavior.
pub fn is_powered_off(power: Option<MachinePowerState>) -> bool {
    match power {
        Some(MachinePowerState::Powered | MachinePowerState::PoweringUp) | None => false,
        Some(_) => true,
    }
}

/// Sort faults most-recent-first.
///
/// Stable: records with equal timestamps (including the epoch-0 bucket of
/// missing/unparseable dates) keep their input order.
pub fn sort_faults_desc(faults: &mut [FaultRecord]) {
    faults.sort_by_key(|record| std::cmp::Reverse(record.occurrence_instant()));
}
