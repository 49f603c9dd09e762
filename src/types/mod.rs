//! Shared data structures for the warehouse automation console
//!
//! This module defines the telemetry data model exchanged with the machine
//! controller:
//! - Machine identity, mode, and power state
//! - Active fault records and fault codes
//! - Bay, bay position, loading unit, and cell inventory
//! - The flat physical sensor vector
//!
//! Wire types use PascalCase field names matching the controller API.

mod machine;
mod fault;
mod bay;
mod sensors;

pub use machine::*;
pub use fault::*;
pub use bay::*;
pub use sensors::*;
