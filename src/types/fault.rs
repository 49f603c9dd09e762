//! Active fault records and fault codes

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Machine fault code.
///
/// Integer enumeration defined by the controller firmware. Named variants
/// cover the codes the recovery routing distinguishes plus the common
/// security/connection conditions shown in diagnostics; any other value is
/// carried through `Other` unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum FaultCode {
    NoFault,
    ConditionsNotMetForPositioning,
    ConditionsNotMetForHoming,
    SecurityWasTriggered,
    SecurityButtonWasTriggered,
    SecurityBarrierWasTriggered,
    InverterFaultStateDetected,
    ZeroSensorErrorAfterPickup,
    ZeroSensorErrorAfterDeposit,
    MissingZeroSensorWithEmptyElevator,
    ZeroSensorActiveWithFullElevator,
    SensorZeroBayNotActiveAtStart,
    InverterConnectionError,
    IoDeviceConnectionError,
    LoadUnitWeightExceeded,
    LoadUnitHeightFromBayExceeded,
    WarehouseIsFull,
    MoveBayChainNotAllowed,
    LoadUnitMissingOnElevator,
    LoadUnitMissingOnBay,
    SensorZeroBayNotActiveAtEnd,
    LoadUnitHeightFromBayTooLow,
    PreFireAlarm,
    FireAlarm,
    Other(i32),
}

impl From<i32> for FaultCode {
    fn from(value: i32) -> Self {
        match value {
            -1 => Self::NoFault,
            2 => Self::ConditionsNotMetForPositioning,
            4 => Self::ConditionsNotMetForHoming,
            5 => Self::SecurityWasTriggered,
            6 => Self::SecurityButtonWasTriggered,
            7 => Self::SecurityBarrierWasTriggered,
            9 => Self::InverterFaultStateDetected,
            12 => Self::ZeroSensorErrorAfterPickup,
            13 => Self::ZeroSensorErrorAfterDeposit,
            15 => Self::MissingZeroSensorWithEmptyElevator,
            16 => Self::ZeroSensorActiveWithFullElevator,
            22 => Self::SensorZeroBayNotActiveAtStart,
            23 => Self::InverterConnectionError,
            24 => Self::IoDeviceConnectionError,
            26 => Self::LoadUnitWeightExceeded,
            27 => Self::LoadUnitHeightFromBayExceeded,
            39 => Self::WarehouseIsFull,
            41 => Self::MoveBayChainNotAllowed,
            63 => Self::LoadUnitMissingOnElevator,
            64 => Self::LoadUnitMissingOnBay,
            70 => Self::SensorZeroBayNotActiveAtEnd,
            89 => Self::LoadUnitHeightFromBayTooLow,
            90 => Self::PreFireAlarm,
            91 => Self::FireAlarm,
            other => Self::Other(other),
        }
    }
}

impl From<FaultCode> for i32 {
    fn from(code: FaultCode) -> Self {
        match code {
            FaultCode::NoFault => -1,
            FaultCode::ConditionsNotMetForPositioning => 2,
            FaultCode::ConditionsNotMetForHoming => 4,
            FaultCode::SecurityWasTriggered => 5,
            FaultCode::SecurityButtonWasTriggered => 6,
            FaultCode::SecurityBarrierWasTriggered => 7,
            FaultCode::InverterFaultStateDetected => 9,
            FaultCode::ZeroSensorErrorAfterPickup => 12,
            FaultCode::ZeroSensorErrorAfterDeposit => 13,
            FaultCode::MissingZeroSensorWithEmptyElevator => 15,
            FaultCode::ZeroSensorActiveWithFullElevator => 16,
            FaultCode::SensorZeroBayNotActiveAtStart => 22,
            FaultCode::InverterConnectionError => 23,
            FaultCode::IoDeviceConnectionError => 24,
            FaultCode::LoadUnitWeightExceeded => 26,
            FaultCode::LoadUnitHeightFromBayExceeded => 27,
            FaultCode::WarehouseIsFull => 39,
            FaultCode::MoveBayChainNotAllowed => 41,
            FaultCode::LoadUnitMissingOnElevator => 63,
            FaultCode::LoadUnitMissingOnBay => 64,
            FaultCode::SensorZeroBayNotActiveAtEnd => 70,
            FaultCode::LoadUnitHeightFromBayTooLow => 89,
            FaultCode::PreFireAlarm => 90,
            FaultCode::FireAlarm => 91,
            FaultCode::Other(other) => other,
        }
    }
}

impl std::fmt::Display for FaultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E-{}", i32::from(*self))
    }
}

impl Default for FaultCode {
    fn default() -> Self {
        Self::NoFault
    }
}

/// Fault severity band used by the header display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSeverity {
    Low,
    Normal,
    High,
    Homing,
}

impl FaultSeverity {
    /// Map the controller's raw severity integer to a display band.
    ///
    /// Unknown values are shown as `Normal` rather than hidden.
    pub fn from_raw(raw: Option<i32>) -> Self {
        match raw {
            Some(0) => Self::Low,
            Some(2) => Self::High,
            Some(3) => Self::Homing,
            _ => Self::Normal,
        }
    }
}

/// An active fault as reported by the controller.
///
/// The console never mutates these records; resolving a fault is a
/// controller action observed through the next poll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaultRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub code: FaultCode,
    #[serde(default)]
    pub bay_number: Option<u8>,
    /// Controller timestamp, RFC 3339. Kept as received; parsing happens at
    /// sort time so a malformed date never drops the record.
    #[serde(default)]
    pub occurrence_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub severity: Option<i32>,
}

impl FaultRecord {
    /// Occurrence timestamp for ordering.
    ///
    /// Missing or unparseable dates sort as the Unix epoch (oldest), so a
    /// record with a garbled date still appears in the list.
    pub fn occurrence_instant(&self) -> DateTime<Utc> {
        let Some(raw) = self.occurrence_date.as_deref() else {
            return DateTime::<Utc>::UNIX_EPOCH;
        };
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            // Some controller builds omit the offset; read those as UTC.
            .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc()))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn severity_band(&self) -> FaultSeverity {
        FaultSeverity::from_raw(self.severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_code_round_trips_unknown_values() {
        let code: FaultCode = serde_json::from_str("1005").unwrap();
        assert_eq!(code, FaultCode::Other(1005));
        assert_eq!(serde_json::to_string(&code).unwrap(), "1005");
    }

    #[test]
    fn deserializes_controller_record() {
        let raw = r#"{
            "Id": 12,
            "Code": 9,
            "BayNumber": 2,
            "OccurrenceDate": "2024-03-01T09:30:00Z",
            "Description": "Inverter fault",
            "Severity": 2
        }"#;
        let record: FaultRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.code, FaultCode::InverterFaultStateDetected);
        assert_eq!(record.bay_number, Some(2));
        assert_eq!(record.severity_band(), FaultSeverity::High);
    }

    #[test]
    fn offsetless_date_is_read_as_utc() {
        let record = FaultRecord {
            occurrence_date: Some("2024-03-01T09:30:00".into()),
            ..FaultRecord::default()
        };
        let with_offset = FaultRecord {
            occurrence_date: Some("2024-03-01T09:30:00Z".into()),
            ..FaultRecord::default()
        };
        assert_eq!(record.occurrence_instant(), with_offset.occurrence_instant());
    }

    #[test]
    fn unparseable_date_sorts_as_epoch() {
        let record = FaultRecord {
            occurrence_date: Some("not-a-date".into()),
            ..FaultRecord::default()
        };
        assert_eq!(record.occurrence_instant(), DateTime::<Utc>::UNIX_EPOCH);
    }
}
