//! Bay, bay position, loading unit, and cell inventory types

use serde::{Deserialize, Serialize};

/// A drawer/tray tracked by the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadingUnit {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub gross_weight: Option<f64>,
}

impl LoadingUnit {
    /// Display label: code when present, otherwise the numeric id.
    pub fn label(&self) -> String {
        self.code
            .clone()
            .or_else(|| self.id.map(|id| id.to_string()))
            .unwrap_or_else(|| "--".to_string())
    }
}

/// One physical drawer position of a bay (upper or lower).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BayPosition {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub is_upper: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub loading_unit: Option<LoadingUnit>,
}

/// A load/unload station of the warehouse.
///
/// At most one position per (bay, `is_upper`) pair counts as "the" upper or
/// lower position for drawer-presence checks; `upper_position` and
/// `lower_position` return the first match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bay {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub number: u8,
    #[serde(default)]
    pub is_double: bool,
    #[serde(default)]
    pub is_external: bool,
    #[serde(default)]
    pub has_carousel: bool,
    #[serde(default)]
    pub has_shutter: bool,
    #[serde(default)]
    pub positions: Vec<BayPosition>,
}

impl Bay {
    pub fn upper_position(&self) -> Option<&BayPosition> {
        self.positions.iter().find(|position| position.is_upper)
    }

    pub fn lower_position(&self) -> Option<&BayPosition> {
        self.positions.iter().find(|position| !position.is_upper)
    }

    /// The loading unit currently sitting in the bay's upper position.
    pub fn upper_loading_unit(&self) -> Option<&LoadingUnit> {
        self.upper_position()
            .and_then(|position| position.loading_unit.as_ref())
    }
}

/// Cell block level reported by the inventory read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockLevel {
    #[default]
    Undefined,
    None,
    SpaceOnly,
    Blocked,
    NeedsTest,
    UnderWeight,
    Reserved,
}

/// One storage cell of the warehouse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cell {
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub block_level: BlockLevel,
}
