//! Network side of the boot cycle: WiFi join, the BrickServer exchange and
//! the Activator push window.

pub mod activator;
pub mod connection;
pub mod protocol;
