//! Door-relay controller firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiAdapter   MqttAdapter   HttpAdapter   MdnsAdapter         │
//! │  (LinkPort)    (SessionPort) (HttpPort)    (DiscoveryPort)     │
//! │  GpioOutput ×2 MonotonicClock LogEventSink NvsAdapter          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  LinkSupervisor · SessionSupervisor · CommandRouter    │    │
//! │  │  ActuatorGuard                                         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::info;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use dooropener::adapters::gpio::{self, GpioOutput};
use dooropener::adapters::http::HttpAdapter;
use dooropener::adapters::log_sink::LogEventSink;
use dooropener::adapters::mdns::MdnsAdapter;
use dooropener::adapters::mqtt::MqttAdapter;
use dooropener::adapters::nvs::NvsAdapter;
use dooropener::adapters::time::MonotonicClock;
use dooropener::adapters::wifi::WifiAdapter;
use dooropener::adapters::{EspPlatform, device_id};
use dooropener::app::ports::{DigitalOutput, Level};
use dooropener::app::service::{Controller, PlatformParts};
use dooropener::config::{self, DeviceConfig};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  DoorOpener v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new(nvs_partition.clone()) {
        Ok(store) => config::load_or_default(&store),
        Err(e) => {
            log::warn!("NVS unavailable ({}), using defaults", e);
            DeviceConfig::default()
        }
    };

    // ── 3. Identity ───────────────────────────────────────────
    let identity = device_id::identity(&config.identity_prefix, &device_id::read_mac());
    info!("Device identity: {}", identity);

    // ── 4. Outputs (relay first, so it is released before anything else) ──
    let mut relay = GpioOutput::new(gpio::output_pin(config.relay_gpio)?, "relay");
    relay.set(if config.relay_active_low { Level::High } else { Level::Low });
    let indicator = GpioOutput::new(gpio::output_pin(config.status_led_gpio)?, "status_led");

    // ── 5. Network adapters ───────────────────────────────────
    let wifi = WifiAdapter::new(peripherals.modem, sysloop, Some(nvs_partition))?;

    let parts = PlatformParts::<EspPlatform> {
        link: wifi,
        session: MqttAdapter::new(),
        http: HttpAdapter::new(),
        discovery: MdnsAdapter::new(&identity),
        relay,
        indicator,
        clock: MonotonicClock::new(),
        sink: LogEventSink::new(),
    };

    // ── 6. Run ────────────────────────────────────────────────
    let mut controller = Controller::new(config, &identity, parts);
    controller.run()
}
