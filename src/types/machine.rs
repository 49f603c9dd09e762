//! Machine identity, operating mode, and power state

use serde::{Deserialize, Serialize};

/// Machine identity record returned by the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineIdentity {
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    /// Total bays installed on this machine (1-3).
    #[serde(default)]
    pub bay_count: Option<u8>,
}

/// Machine operating mode.
///
/// The controller encodes modes as integers. Only the modes this subsystem
/// distinguishes get named variants; everything else round-trips losslessly
/// through `Other` so a firmware that grows new modes never fails a poll.
///
/// Manual mode is bay-indexed: bay 1 runs `Manual`, bay 2 `Manual2`,
/// bay 3 `Manual3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MachineMode {
    NotSpecified,
    Automatic,
    Manual,
    Manual2,
    Manual3,
    Shutdown,
    SwitchingToAutomatic,
    SwitchingToManual,
    Other(i32),
}

impl From<i32> for MachineMode {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::NotSpecified,
            1 => Self::Automatic,
            2 => Self::Manual,
            3 => Self::Manual2,
            4 => Self::Manual3,
            20 => Self::Shutdown,
            21 => Self::SwitchingToAutomatic,
            22 => Self::SwitchingToManual,
            other => Self::Other(other),
        }
    }
}

impl From<MachineMode> for i32 {
    fn from(mode: MachineMode) -> Self {
        match mode {
            MachineMode::NotSpecified => 0,
            MachineMode::Automatic => 1,
            MachineMode::Manual => 2,
            MachineMode::Manual2 => 3,
            MachineMode::Manual3 => 4,
            MachineMode::Shutdown => 20,
            MachineMode::SwitchingToAutomatic => 21,
            MachineMode::SwitchingToManual => 22,
            MachineMode::Other(other) => other,
        }
    }
}

impl MachineMode {
    /// The manual-mode variant for a given bay number.
    ///
    /// Bay numbers outside 1-3 fall back to the bay-1 variant.
    pub fn manual_for_bay(bay_number: u8) -> Self {
        match bay_number {
            2 => Self::Manual2,
            3 => Self::Manual3,
            _ => Self::Manual,
        }
    }
}

/// Machine power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MachinePowerState {
    NotSpecified,
    Unpowered,
    PoweringUp,
    Powered,
    PoweringDown,
    Other(i32),
}

impl From<i32> for MachinePowerState {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::NotSpecified,
            1 => Self::Unpowered,
            2 => Self::PoweringUp,
            3 => Self::Powered,
            4 => Self::PoweringDown,
            other => Self::Other(other),
        }
    }
}

impl From<MachinePowerState> for i32 {
    fn from(state: MachinePowerState) -> Self {
        match state {
            MachinePowerState::NotSpecified => 0,
            MachinePowerState::Unpowered => 1,
            MachinePowerState::PoweringUp => 2,
            MachinePowerState::Powered => 3,
            MachinePowerState::PoweringDown => 4,
            MachinePowerState::Other(other) => other,
        }
    }
}
