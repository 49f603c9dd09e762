//! Vertibay: Warehouse Console Telemetry Engine
//!
//! Telemetry reconciliation and fault routing for a vertical-warehouse
//! automation console.
//!
//! ## Architecture
//!
//! - **Push Event Bridge**: two named-event channels merged into one
//!   fan-out, mapped to cache invalidation tags
//! - **Telemetry Aggregator**: independent polling reads merged into one
//!   consistent snapshot with derived fields
//! - **Routing Engine**: pure fault-code → recovery-route decision table
//! - **Navigation Reconciler**: priority-ordered navigation decisions,
//!   one per pass, idempotent

pub mod config;
pub mod types;
pub mod client;
pub mod events;
pub mod telemetry;
pub mod routing;
pub mod reconciler;
pub mod shell;

// Re-export configuration
pub use config::ConsoleConfig;

// Re-export commonly used types
pub use types::{
    Bay, BayPosition, BlockLevel, Cell, FaultCode, FaultRecord, FaultSeverity, LoadingUnit,
    MachineIdentity, MachineMode, MachinePowerState, SensorVector,
};

// Re-export the client seam
pub use client::{AutomationClient, ClientError, HttpAutomationClient};

// Re-export push event components
pub use events::{
    tags_for_event, CacheTag, ChannelScope, NamedEvent, PushEvent, PushEventBridge,
    RealtimeTransport, TransportError,
};

// Re-export telemetry components
pub use telemetry::{TelemetryAggregator, TelemetrySnapshot, TelemetrySource};

// Re-export routing and reconciliation
pub use routing::{resolve_fault_route, RouteId, RoutingInputs};
pub use reconciler::{
    reconcile, ConsolePath, NavigationAction, ReconcileContext, ReconcilerState,
};
pub use shell::{ConsoleShell, LoggingNavigator, Navigator};
