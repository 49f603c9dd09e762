//! Console Configuration Module
//!
//! Per-installation configuration loaded from TOML files, replacing
//! hardcoded controller offsets and cadences with installer-tunable values.
//!
//! ## Loading Order
//!
//! 1. `VERTIBAY_CONFIG` environment variable (path to TOML file)
//! 2. `vertibay.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The sensor offsets in `[sensor_map]` are a versioned contract with the
//! controller firmware; they are configuration precisely so a firmware with
//! a different sensor layout can be adopted without a rebuild.

pub mod defaults;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use defaults::{
    BAY_POLL_INTERVAL_MS, BAY_ZERO_CHAIN_SENSORS, CELLS_POLL_INTERVAL_MS,
    ELEVATOR_ZERO_PAWL_SENSORS, LU_PRESENT_MACHINE_SIDE_SENSOR, LU_PRESENT_OPERATOR_SIDE_SENSOR,
    STATUS_POLL_INTERVAL_MS,
};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Polling cadences for the telemetry aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollIntervals {
    /// Identity, mode, power, and fault reads (ms).
    pub status_ms: u64,
    /// Bay snapshot and sensor vector reads (ms).
    pub bay_ms: u64,
    /// Warehouse cell inventory read (ms).
    pub cells_ms: u64,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            status_ms: STATUS_POLL_INTERVAL_MS,
            bay_ms: BAY_POLL_INTERVAL_MS,
            cells_ms: CELLS_POLL_INTERVAL_MS,
        }
    }
}

/// Offsets into the flat sensor vector, as defined by the controller
/// firmware's sensor map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorMap {
    /// Elevator zero-pawl chain sensors; either active counts as zero.
    pub elevator_zero_pawl: Vec<usize>,
    /// Load-unit presence photocell, operator side.
    pub lu_present_operator_side: usize,
    /// Load-unit presence photocell, machine side.
    pub lu_present_machine_side: usize,
    /// Bay zero-chain sensor per bay, indexed bay 1 first.
    pub bay_zero_chain: Vec<usize>,
}

impl Default for SensorMap {
    fn default() -> Self {
        Self {
            elevator_zero_pawl: ELEVATOR_ZERO_PAWL_SENSORS.to_vec(),
            lu_present_operator_side: LU_PRESENT_OPERATOR_SIDE_SENSOR,
            lu_present_machine_side: LU_PRESENT_MACHINE_SIDE_SENSOR,
            bay_zero_chain: BAY_ZERO_CHAIN_SENSORS.to_vec(),
        }
    }
}

impl SensorMap {
    /// Zero-chain sensor index for a bay. Bay numbers outside the configured
    /// range fall back to the bay-1 entry.
    pub fn bay_zero_chain_index(&self, bay_number: u8) -> usize {
        let slot = match bay_number {
            2 => 1,
            3 => 2,
            _ => 0,
        };
        self.bay_zero_chain
            .get(slot)
            .or_else(|| self.bay_zero_chain.first())
            .copied()
            .unwrap_or(BAY_ZERO_CHAIN_SENSORS[0])
    }
}

/// Top-level console configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Bay this console is installed at (1-3).
    pub bay_number: u8,
    /// Base URL of the machine controller HTTP API.
    pub controller_url: String,
    /// Operator-scope push channel endpoint (relative to `controller_url`).
    pub operator_channel_path: String,
    /// Installation-scope push channel endpoint (relative to `controller_url`).
    pub installation_channel_path: String,
    /// Bays running the new-step handling for height faults.
    ///
    /// A new-step bay keeps height-exceeded/too-low faults on the generic
    /// details page instead of the load-unit wizard.
    pub new_step_bays: Vec<u8>,
    pub poll: PollIntervals,
    pub sensor_map: SensorMap,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bay_number: 1,
            controller_url: "http://127.0.0.1:5000".to_string(),
            operator_channel_path: "/hubs/operator".to_string(),
            installation_channel_path: "/hubs/installation".to_string(),
            new_step_bays: Vec::new(),
            poll: PollIntervals::default(),
            sensor_map: SensorMap::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration using the documented lookup order.
    ///
    /// Never fails: an unreadable or malformed file logs a warning and the
    /// next source is tried, ending at built-in defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("VERTIBAY_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), bay = config.bay_number, "Loaded console config from VERTIBAY_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from VERTIBAY_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "VERTIBAY_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("vertibay.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(bay = config.bay_number, "Loaded console config from ./vertibay.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./vertibay.toml, using defaults");
                }
            }
        }

        info!("No vertibay.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Whether this console's bay runs the new-step height-fault handling.
    pub fn is_new_step_bay(&self) -> bool {
        self.new_step_bays.contains(&self.bay_number)
    }
}
