//! Chip-level services: setup input, MAC, firmware id, restart.
//!
//! Implements [`SystemPort`].  The firmware id is the first 16 bytes of the
//! running image's ELF SHA-256 in hex, read once at construction.

use log::info;

use crate::adapters::device_id::{MacAddress, read_mac};
use crate::app::ports::SystemPort;
use crate::drivers::setup_pin;

pub type FirmwareId = heapless::String<32>;

pub struct SystemAdapter {
    mac: MacAddress,
    firmware_id: FirmwareId,
    #[cfg(not(target_os = "espidf"))]
    setup_held: bool,
}

impl SystemAdapter {
    pub fn new() -> Self {
        Self {
            mac: read_mac(),
            firmware_id: read_firmware_id(),
            #[cfg(not(target_os = "espidf"))]
            setup_held: false,
        }
    }

    /// Simulation: hold or release the setup input.
    #[cfg(not(target_os = "espidf"))]
    pub fn hold_setup(&mut self, held: bool) {
        self.setup_held = held;
    }
}

impl Default for SystemAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
fn read_firmware_id() -> FirmwareId {
    use core::fmt::Write;

    let mut id = FirmwareId::new();
    // SAFETY: returns a pointer into the static app descriptor of the
    // running image; never null once the app is running.
    let desc = unsafe { esp_idf_svc::sys::esp_app_get_description() };
    if let Some(desc) = unsafe { desc.as_ref() } {
        for b in &desc.app_elf_sha256[..16] {
            let _ = write!(id, "{:02x}", b);
        }
    }
    id
}

#[cfg(not(target_os = "espidf"))]
fn read_firmware_id() -> FirmwareId {
    let mut id = FirmwareId::new();
    let _ = id.push_str(concat!("sim-", env!("CARGO_PKG_VERSION")));
    id
}

impl SystemPort for SystemAdapter {
    #[cfg(target_os = "espidf")]
    fn setup_asserted(&mut self) -> bool {
        setup_pin::is_asserted()
    }

    #[cfg(not(target_os = "espidf"))]
    fn setup_asserted(&mut self) -> bool {
        self.setup_held || setup_pin::is_asserted()
    }

    fn enable_setup_edges(&mut self) -> Result<(), crate::error::Error> {
        setup_pin::enable_edges()?;
        Ok(())
    }

    fn mac_address(&self) -> [u8; 6] {
        self.mac
    }

    fn firmware_id(&self) -> &str {
        &self.firmware_id
    }

    #[cfg(target_os = "espidf")]
    fn restart(&mut self) -> ! {
        info!("SYSTEM: restarting");
        unsafe { esp_idf_svc::sys::esp_restart() };
        #[allow(unreachable_code)]
        loop {
            esp_idf_hal::delay::FreeRtos::delay_ms(1000);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) -> ! {
        info!("SYSTEM(sim): restarting");
        std::process::exit(0)
    }
}
