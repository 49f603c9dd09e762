//! Realtime push events from the controller
//!
//! Two long-lived named-event channels (operator scope and installation
//! scope) feed a single fan-out. Event names map to cache invalidation tags
//! through a static table; payloads are passed through opaquely and never
//! drive state directly — the authoritative data always comes from the next
//! telemetry poll.

mod tags;
mod bridge;

pub use tags::*;
pub use bridge::*;
