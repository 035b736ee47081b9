//! GPIO drivers: one-shot initialization, the setup input and the status LED.

pub mod hw_init;
pub mod setup_pin;
pub mod status_led;
