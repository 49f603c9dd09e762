//! Telemetry aggregation
//!
//! Merges the controller's independent telemetry reads into one consistent
//! `TelemetrySnapshot`, recomputed wholesale on every completed poll.
//! Sources poll on their own cadences and are not atomically consistent
//! with each other; downstream consumers (the navigation reconciler) are
//! written to be correct under momentarily mismatched fields.

mod snapshot;
mod aggregator;

pub use snapshot::*;
pub use aggregator::*;
