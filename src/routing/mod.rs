//! Fault Classification & Routing Engine
//!
//! Pure decision table: `(fault code, bay snapshot, sensor vector, bay
//! number) -> recovery route`. No state, no I/O, total — any unrecognized
//! code lands on the generic details route, and an absent code is a
//! harmless default rather than a panic.
//!
//! The rules are an ordered list evaluated top-to-bottom, first match wins.
//! The ordering is a contract:
//!
//! 1. New-step bays keep height faults on the generic details page.
//! 2. Load unit missing (elevator or bay) → missing-unit recovery.
//! 3. Inverter fault → inverter recovery.
//! 4. Chain/height/weight faults → load-unit error wizard.
//! 5. Zero-sensor classification (sensor-state dependent) → zero recovery.
//! 6. Everything else → generic details.

use serde::Serialize;

use crate::config::SensorMap;
use crate::types::{Bay, FaultCode, SensorVector};

/// Recovery procedure identifier.
///
/// Produced only here; consumed only by the navigation reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteId {
    /// Generic fault details page.
    ErrorDetails,
    /// Guided zero-sensor recovery.
    ErrorZeroSensor,
    /// Inverter fault recovery.
    ErrorInverterFault,
    /// Load unit missing recovery.
    ErrorLoadUnitMissing,
    /// Load unit error wizard (chain/height/weight).
    ErrorLoadUnitErrors,
}

impl RouteId {
    /// Console path of this recovery procedure.
    pub fn path(self) -> &'static str {
        match self {
            Self::ErrorDetails => "/errors/details",
            Self::ErrorZeroSensor => "/errors/zero-sensor",
            Self::ErrorInverterFault => "/errors/inverter-fault",
            Self::ErrorLoadUnitMissing => "/errors/load-unit-missing",
            Self::ErrorLoadUnitErrors => "/errors/load-unit-errors",
        }
    }

    pub const ALL: [Self; 5] = [
        Self::ErrorDetails,
        Self::ErrorZeroSensor,
        Self::ErrorInverterFault,
        Self::ErrorLoadUnitMissing,
        Self::ErrorLoadUnitErrors,
    ];
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Everything the decision table reads.
pub struct RoutingInputs<'a> {
    pub code: Option<FaultCode>,
    pub bay: Option<&'a Bay>,
    pub sensors: &'a SensorVector,
    pub bay_number: u8,
    pub sensor_map: &'a SensorMap,
    /// This bay runs the new-step height-fault handling.
    pub new_step: bool,
}

/// Height faults that the new-step bays handle upstream.
const HEIGHT_FAULTS: [FaultCode; 2] = [
    FaultCode::LoadUnitHeightFromBayExceeded,
    FaultCode::LoadUnitHeightFromBayTooLow,
];

/// Faults handled by the load-unit error wizard.
const LOAD_UNIT_WIZARD_FAULTS: [FaultCode; 4] = [
    FaultCode::MoveBayChainNotAllowed,
    FaultCode::LoadUnitHeightFromBayExceeded,
    FaultCode::LoadUnitHeightFromBayTooLow,
    FaultCode::LoadUnitWeightExceeded,
];

fn new_step_height_fault(inputs: &RoutingInputs<'_>) -> bool {
    inputs.new_step && inputs.code.is_some_and(|code| HEIGHT_FAULTS.contains(&code))
}

fn load_unit_missing(inputs: &RoutingInputs<'_>) -> bool {
    matches!(
        inputs.code,
        Some(FaultCode::LoadUnitMissingOnElevator | FaultCode::LoadUnitMissingOnBay)
    )
}

fn inverter_fault(inputs: &RoutingInputs<'_>) -> bool {
    inputs.code == Some(FaultCode::InverterFaultStateDetected)
}

fn load_unit_wizard_fault(inputs: &RoutingInputs<'_>) -> bool {
    inputs
        .code
        .is_some_and(|code| LOAD_UNIT_WIZARD_FAULTS.contains(&code))
}

/// Elevator-at-zero condition: no zero-pawl chain sensor active and both
/// cradle presence photocells dark.
fn elevator_zero_condition(inputs: &RoutingInputs<'_>) -> bool {
    let map = inputs.sensor_map;
    let zero_chain = inputs.sensors.any(&map.elevator_zero_pawl);
    let lu_operator_side = inputs.sensors.get(map.lu_present_operator_side);
    let lu_machine_side = inputs.sensors.get(map.lu_present_machine_side);
    !zero_chain && !lu_machine_side && !lu_operator_side
}

/// Bay-at-zero condition: bay zero-chain sensor dark on a carousel bay.
fn bay_zero_condition(inputs: &RoutingInputs<'_>) -> bool {
    let index = inputs.sensor_map.bay_zero_chain_index(inputs.bay_number);
    let bay_zero_chain = inputs.sensors.get(index);
    !bay_zero_chain && inputs.bay.is_some_and(|bay| bay.has_carousel)
}

fn zero_sensor_fault(inputs: &RoutingInputs<'_>) -> bool {
    match inputs.code {
        Some(
            FaultCode::MissingZeroSensorWithEmptyElevator | FaultCode::ZeroSensorErrorAfterDeposit,
        ) => elevator_zero_condition(inputs),
        Some(
            FaultCode::SensorZeroBayNotActiveAtStart | FaultCode::SensorZeroBayNotActiveAtEnd,
        ) => bay_zero_condition(inputs),
        Some(FaultCode::ConditionsNotMetForHoming) => {
            elevator_zero_condition(inputs) || bay_zero_condition(inputs)
        }
        _ => false,
    }
}

/// The decision table. First match wins; order is load-bearing.
const RULES: [(fn(&RoutingInputs<'_>) -> bool, RouteId); 5] = [
    (new_step_height_fault, RouteId::ErrorDetails),
    (load_unit_missing, RouteId::ErrorLoadUnitMissing),
    (inverter_fault, RouteId::ErrorInverterFault),
    (load_unit_wizard_fault, RouteId::ErrorLoadUnitErrors),
    (zero_sensor_fault, RouteId::ErrorZeroSensor),
];

/// Classify an active fault into its recovery route.
pub fn resolve_fault_route(inputs: &RoutingInputs<'_>) -> RouteId {
    for (matches, route) in RULES {
        if matches(inputs) {
            return route;
        }
    }
    RouteId::ErrorDetails
}
