//! Fuzz target: stored config blob
//!
//! Feeds arbitrary bytes through the same path as a boot-time NVS load.
//! Whatever is stored, the result is either a validated config or an
//! error, never a panic.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use dooropener::adapters::nvs::NvsAdapter;
use dooropener::app::ports::ConfigPort;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(store) = NvsAdapter::new() else {
        return;
    };
    store.sim_write_raw(data);
    if let Ok(config) = store.load() {
        assert!(config.validate().is_ok());
    }
});
