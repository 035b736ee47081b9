//! Setup input: level read at boot, falling-edge interrupt in
//! configuration mode.
//!
//! ## Hardware
//!
//! Active-low momentary switch on [`pins::SETUP_GPIO`] with the internal
//! pull-up.  Held low at boot it selects configuration mode; in
//! configuration mode every press is a reset request.
//!
//! The ISR debounces and counts the edge
//! ([`safety::record_edge`](crate::safety::record_edge)); the blink
//! acknowledgement and the destructive branch run in the foreground.

use crate::drivers::hw_init::{self, HwInitError};
use crate::pins;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// `true` while the input is held low.
pub fn is_asserted() -> bool {
    !hw_init::gpio_read(pins::SETUP_GPIO)
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn setup_gpio_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time is a counter read; safe in ISR context.
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u32;
    crate::safety::record_edge(now_ms);
}

/// Install the GPIO ISR service and route falling edges of the setup input
/// to the reset circuit.
#[cfg(target_os = "espidf")]
pub fn enable_edges() -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed.
    // The handler only takes one critical section on the reset counter.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_set_intr_type(pins::SETUP_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE);
        let ret = gpio_isr_handler_add(pins::SETUP_GPIO, Some(setup_gpio_isr), core::ptr::null_mut());
        if ret != ESP_OK as i32 {
            return Err(HwInitError::IsrAddFailed(ret));
        }
        gpio_intr_enable(pins::SETUP_GPIO);
    }
    log::info!("setup_pin: falling-edge ISR installed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn enable_edges() -> Result<(), HwInitError> {
    log::info!("setup_pin(sim): ISR skipped");
    Ok(())
}
