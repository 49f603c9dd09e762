//! Flat physical sensor vector

use serde::{Deserialize, Serialize};

/// Fixed-length ordered vector of booleans, one per physical sensor.
///
/// Index meanings are a closed, versioned contract with the controller
/// firmware (see `config::SensorMap` for the offsets this subsystem reads).
/// Out-of-range reads are `false`, never a panic: a short vector from an
/// older firmware must not take the console down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorVector(Vec<bool>);

impl SensorVector {
    pub fn new(states: Vec<bool>) -> Self {
        Self(states)
    }

    /// Sensor state at `index`; `false` when out of range.
    pub fn get(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    /// True if any of the given indices is active.
    pub fn any(&self, indices: &[usize]) -> bool {
        indices.iter().any(|&index| self.get(index))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<bool>> for SensorVector {
    fn from(states: Vec<bool>) -> Self {
        Self(states)
    }
}
