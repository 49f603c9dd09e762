//! Event → cache-tag invalidation table
//!
//! Static data, no behavior. The per-scope event lists are intentionally
//! broader than the tag table: controller versions emit events the console
//! does not yet act on, and an unknown name is simply ignored.

use crate::telemetry::TelemetrySource;

/// Cache invalidation tag.
///
/// Invalidating a tag forces the next poll of every telemetry query tagged
/// with it, bypassing its scheduled interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Identity,
    Mode,
    Power,
    Faults,
    Cells,
    Bay,
    Sensors,
    ElevatorPosition,
    LoadingUnits,
    Missions,
}

impl CacheTag {
    /// Telemetry sources backing this tag within the aggregator.
    ///
    /// Tags with no backing source here (`ElevatorPosition`, `Missions`)
    /// target console queries outside this subsystem and invalidate nothing
    /// locally.
    pub fn sources(self) -> &'static [TelemetrySource] {
        match self {
            Self::Identity => &[TelemetrySource::Identity],
            Self::Mode => &[TelemetrySource::Mode],
            Self::Power => &[TelemetrySource::Power],
            Self::Faults => &[TelemetrySource::Faults],
            Self::Cells => &[TelemetrySource::Cells],
            Self::Bay => &[TelemetrySource::Bay],
            Self::Sensors => &[TelemetrySource::Sensors],
            Self::LoadingUnits => &[TelemetrySource::Bay, TelemetrySource::Cells],
            Self::ElevatorPosition | Self::Missions => &[],
        }
    }
}

/// Events subscribed on the operator-scope channel.
pub const OPERATOR_EVENTS: &[&str] = &[
    "MissionChanged",
    "BayStatusChanged",
    "ErrorStatusChanged",
    "LoadingUnitsChanged",
    "ProductsChanged",
    "ElevatorPositionChanged",
    "ShutterPositionChanged",
    "MachineModeChanged",
    "MachinePowerChanged",
];

/// Events subscribed on the installation-scope channel.
pub const INSTALLATION_EVENTS: &[&str] = &[
    "CalibrationProcedureStatusChanged",
    "HorizontalAxisChanged",
    "VerticalAxisChanged",
    "BayChainPositionChanged",
    "InverterStatusChanged",
    "SensorsChanged",
    "HomingProcedureStatusChanged",
];

/// Invalidation tags for a named controller event.
///
/// Unknown names return the empty set — not an error.
pub fn tags_for_event(name: &str) -> &'static [CacheTag] {
    match name {
        "MachineModeChanged" => &[CacheTag::Mode],
        "MachinePowerChanged" => &[CacheTag::Power],
        "ErrorStatusChanged" => &[CacheTag::Faults],
        "BayStatusChanged" => &[CacheTag::Bay],
        "LoadingUnitsChanged" => &[CacheTag::LoadingUnits, CacheTag::Cells],
        "ElevatorPositionChanged" => &[CacheTag::ElevatorPosition, CacheTag::LoadingUnits],
        "MissionChanged" => &[CacheTag::Missions, CacheTag::Bay],
        "SensorsChanged" => &[CacheTag::Sensors],
        "HorizontalAxisChanged" => &[CacheTag::Sensors],
        "VerticalAxisChanged" => &[CacheTag::ElevatorPosition, CacheTag::Sensors],
        "BayChainPositionChanged" => &[CacheTag::Bay, CacheTag::Sensors],
        "InverterStatusChanged" => &[CacheTag::Faults],
        "HomingProcedureStatusChanged" => &[CacheTag::Sensors, CacheTag::Faults],
        _ => &[],
    }
}
