//! Navigation Reconciler
//!
//! One reconciliation pass turns the latest telemetry into at most one
//! navigation action. The pass is synchronous and pure over its inputs plus
//! a small session state struct — it never fetches, never awaits, and never
//! navigates when the console is already at the computed target, so
//! re-running it on every poll tick is safe.
//!
//! Rule order is a contract: faults pre-empt the drawer auto-popup; the
//! power-off exit from the drawer page only applies when no fault rule
//! fired; a stale fault page is only left once the fault rule stopped
//! firing.

use serde::Serialize;

use crate::config::{ConsoleConfig, SensorMap};
use crate::routing::{resolve_fault_route, RouteId, RoutingInputs};
use crate::telemetry::TelemetrySnapshot;
use crate::types::{Bay, SensorVector};

/// Console paths the reconciler navigates between.
pub mod paths {
    /// Operator main menu.
    pub const MAIN_MENU: &str = "/menu/main-menu";
    /// Drawer-present operator page.
    pub const DRAWER_PRESENT: &str = "/operator/drawer-present";
    /// Wait page shown while an item operation has no drawer in the bay.
    pub const ITEM_OPERATION_WAIT: &str = "/operator/item-operation-wait";
}

/// A console navigation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolePath(String);

impl ConsolePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn main_menu() -> Self {
        Self::new(paths::MAIN_MENU)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this path shows a fault/recovery procedure.
    pub fn is_fault_display(&self) -> bool {
        RouteId::ALL.iter().any(|route| route.path() == self.0)
    }
}

impl std::fmt::Display for ConsolePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RouteId> for ConsolePath {
    fn from(route: RouteId) -> Self {
        Self::new(route.path())
    }
}

/// A single navigation decision.
///
/// All reconciler-driven navigations replace the current history entry
/// rather than pushing, so transient fault/drawer detours never pollute the
/// back stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationAction {
    pub target: ConsolePath,
}

impl NavigationAction {
    fn to(target: impl Into<ConsolePath>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl From<&str> for ConsolePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Session-scoped reconciler memory.
///
/// Created at shell mount, updated once per pass, discarded at unmount.
/// This is the only mutable state in the subsystem; everything else is
/// derived fresh from telemetry each pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerState {
    /// Where to return once a fault page goes stale.
    pub last_non_fault_path: Option<ConsolePath>,
    /// Rising edges of "upper drawer present" observed this session.
    pub upper_drawer_arrival_count: u32,
    /// Arrival count already answered with an auto-navigation.
    pub drawer_redirected_arrival_count: u32,
    /// Drawer presence seen by the previous pass, for edge detection.
    pub prev_has_upper_drawer: bool,
}

/// Per-pass inputs that do not come from telemetry.
pub struct ReconcileContext<'a> {
    pub bay_number: u8,
    pub sensor_map: &'a SensorMap,
    pub new_step: bool,
}

impl<'a> ReconcileContext<'a> {
    pub fn from_config(config: &'a ConsoleConfig) -> Self {
        Self {
            bay_number: config.bay_number,
            sensor_map: &config.sensor_map,
            new_step: config.is_new_step_bay(),
        }
    }
}

/// One reconciliation pass.
///
/// Reads the latest already-fetched values only; the caller re-runs it on
/// every change to the fault list, bay snapshot, sensor vector, power flag,
/// or current path. Returns `None` when the console should stay where it
/// is — including when the computed target equals `current`.
pub fn reconcile(
    snapshot: &TelemetrySnapshot,
    bay: Option<&Bay>,
    sensors: &SensorVector,
    current: &ConsolePath,
    state: &mut ReconcilerState,
    ctx: &ReconcileContext<'_>,
) -> Option<NavigationAction> {
    // Remember the last safe (non-fault) location.
    if !current.is_fault_display() {
        state.last_non_fault_path = Some(current.clone());
    }

    // Drawer arrival edge detection. Leaving the bay clears the one-shot
    // memory so the next arrival triggers again.
    let has_upper_drawer = bay.is_some_and(|bay| bay.upper_loading_unit().is_some());
    if has_upper_drawer && !state.prev_has_upper_drawer {
        state.upper_drawer_arrival_count += 1;
    }
    if !has_upper_drawer {
        state.upper_drawer_arrival_count = 0;
        state.drawer_redirected_arrival_count = 0;
    }
    state.prev_has_upper_drawer = has_upper_drawer;

    // Priority 1 — active faults pre-empt everything.
    if snapshot.has_faults {
        let route = resolve_fault_route(&RoutingInputs {
            code: snapshot.primary_fault().map(|fault| fault.code),
            bay,
            sensors,
            bay_number: ctx.bay_number,
            sensor_map: ctx.sensor_map,
            new_step: ctx.new_step,
        });
        if current.as_str() != route.path() {
            return Some(NavigationAction::to(route));
        }
        return None;
    }

    // Priority 2 — drawer auto-present, one navigation per arrival.
    if has_upper_drawer
        && state.upper_drawer_arrival_count > state.drawer_redirected_arrival_count
        && current.as_str() != paths::DRAWER_PRESENT
        && !snapshot.is_powered_off
    {
        state.drawer_redirected_arrival_count = state.upper_drawer_arrival_count;
        return Some(NavigationAction::to(paths::DRAWER_PRESENT));
    }

    // Priority 3 — drawer left while parked on its page.
    if !has_upper_drawer
        && current.as_str() == paths::DRAWER_PRESENT
        && !snapshot.is_powered_off
    {
        return Some(NavigationAction::to(paths::ITEM_OPERATION_WAIT));
    }

    // Priority 4 — powered off while parked on the drawer page.
    if snapshot.is_powered_off && current.as_str() == paths::DRAWER_PRESENT {
        return Some(NavigationAction::to(paths::MAIN_MENU));
    }

    // Priority 5 — parked on a fault page whose fault has cleared.
    if current.is_fault_display() {
        let target = state
            .last_non_fault_path
            .clone()
            .unwrap_or_else(ConsolePath::main_menu);
        return Some(NavigationAction { target });
    }

    None
}
