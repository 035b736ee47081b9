//! Brick identity derived from the ESP32 factory MAC address.
//!
//! The brick id is the station MAC in the usual colon notation
//! (`AA:BB:CC:DD:EE:FF`).  It is:
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - Shown as `BrickID` on the configuration console
//! - What the BrickServer keys a brick on

/// Fixed-size brick id string: 17 chars.
pub type BrickIdString = heapless::String<17>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Format `mac` as `AA:BB:CC:DD:EE:FF`.
pub fn brick_id(mac: &MacAddress) -> BrickIdString {
    let mut id = BrickIdString::new();
    use core::fmt::Write;
    let _ = write!(
        id,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    id
}
