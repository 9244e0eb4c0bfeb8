//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable, human-readable identity in the form `{prefix}-xxyyzz`
//! (last 3 bytes of the 6-byte MAC in lowercase hex).  The identity is:
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - Used as the MQTT client id
//! - Used as mDNS hostname (`door-xxyyzz.local`) and service instance name

use core::fmt::Write;

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

/// Derive the identity from `prefix` and the last 3 MAC bytes.
pub fn identity(prefix: &str, mac: &MacAddress) -> String {
    let mut id = String::with_capacity(prefix.len() + 7);
    let _ = write!(id, "{}-{:02x}{:02x}{:02x}", prefix, mac[3], mac[4], mac[5]);
    id
}
