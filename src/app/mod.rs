//! Application core: the Brick lifecycle, zero direct I/O.
//!
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod orchestrator;
pub mod ports;

pub use orchestrator::{Brick, CycleEnd, Ports};
