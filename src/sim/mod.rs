//! Discrete-event replay of the trip table.

/// Logical clock and time-ordered event queue.
pub mod clock;
pub mod engine;
/// Vehicle and VPP aggregate entities.
pub mod vehicle;

pub use clock::EventQueue;
pub use engine::{Engine, RunOutcome};
pub use vehicle::{Vehicle, Vpp};
