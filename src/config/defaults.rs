//! System-wide default constants.
//!
//! Centralises the magic numbers of the telemetry subsystem. Grouped by
//! concern for easy discovery.

// ============================================================================
// Telemetry polling
// ============================================================================

/// Poll interval for machine status reads: identity, mode, power, faults (ms).
pub const STATUS_POLL_INTERVAL_MS: u64 = 2_000;

/// Poll interval for bay snapshot and sensor vector reads (ms).
///
/// These drive drawer-presence detection and must stay under the operator's
/// perception threshold.
pub const BAY_POLL_INTERVAL_MS: u64 = 1_500;

/// Poll interval for the warehouse-wide cell inventory (ms).
///
/// Cells only move on mission completion; a slow cadence is enough.
pub const CELLS_POLL_INTERVAL_MS: u64 = 15_000;

/// HTTP timeout for controller requests (seconds).
pub const CONTROLLER_HTTP_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Push channels
// ============================================================================

/// Base reconnect delay after a push channel drops (seconds).
pub const PUSH_RECONNECT_BASE_SECS: u64 = 1;

/// Cap on the reconnect backoff exponent (base << exponent).
///
/// 1s << 6 = 64s worst case between attempts.
pub const PUSH_RECONNECT_MAX_EXPONENT: u32 = 6;

/// Buffered events per push-channel subscriber before lag drops the oldest.
pub const PUSH_FANOUT_BUFFER: usize = 64;

// ============================================================================
// Sensor map (controller firmware contract)
// ============================================================================

/// Elevator zero-pawl chain sensors; either active means the chain is at zero.
pub const ELEVATOR_ZERO_PAWL_SENSORS: [usize; 2] = [55, 58];

/// Load-unit presence photocell, operator side of the elevator cradle.
pub const LU_PRESENT_OPERATOR_SIDE_SENSOR: usize = 10;

/// Load-unit presence photocell, machine side of the elevator cradle.
pub const LU_PRESENT_MACHINE_SIDE_SENSOR: usize = 11;

/// Bay zero-chain sensors indexed by bay (bay 1, bay 2, bay 3).
pub const BAY_ZERO_CHAIN_SENSORS: [usize; 3] = [74, 90, 106];
