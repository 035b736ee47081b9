//! Single status LED driver.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LED GPIO via hw_init.
//! On host/test: tracks state in-memory only.

use crate::app::ports::StatusIndicator;
use crate::drivers::hw_init;
use crate::pins;

pub struct StatusLed {
    gpio: i32,
    on: bool,
}

impl StatusLed {
    pub fn new() -> Self {
        Self::on_pin(pins::STATUS_LED_GPIO)
    }

    pub fn on_pin(gpio: i32) -> Self {
        Self { gpio, on: false }
    }
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusIndicator for StatusLed {
    fn set(&mut self, on: bool) {
        hw_init::gpio_write(self.gpio, on);
        self.on = on;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
