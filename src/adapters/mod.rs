//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements     | Connects to                     |
//! |--------------|----------------|---------------------------------|
//! | `device_id`  | (none)         | eFuse factory MAC               |
//! | `gpio`       | DigitalOutput  | any `embedded-hal` output pin   |
//! | `http`       | HttpPort       | ESP-IDF httpd                   |
//! | `log_sink`   | EventSink      | Serial log output               |
//! | `mdns`       | DiscoveryPort  | ESP-IDF mDNS component          |
//! | `mqtt`       | SessionPort    | ESP-IDF MQTT client             |
//! | `nvs`        | ConfigPort     | NVS / in-memory store           |
//! | `time`       | Clock          | ESP32 system timer + FreeRTOS   |
//! | `wifi`       | LinkPort       | ESP-IDF WiFi STA                |
//!
//! [`EspPlatform`] bundles them for the firmware binary; [`SimPlatform`]
//! bundles the simulation backends for host runs.

pub mod device_id;
pub mod gpio;
pub mod http;
pub mod log_sink;
pub mod mdns;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;

use crate::app::ports::Platform;

/// The firmware's adapter set.
#[cfg(target_os = "espidf")]
pub struct EspPlatform;

#[cfg(target_os = "espidf")]
pub type EspPin = gpio::GpioOutput<
    esp_idf_svc::hal::gpio::PinDriver<
        'static,
        esp_idf_svc::hal::gpio::AnyOutputPin,
        esp_idf_svc::hal::gpio::Output,
    >,
>;

#[cfg(target_os = "espidf")]
impl Platform for EspPlatform {
    type Link = wifi::WifiAdapter;
    type Session = mqtt::MqttAdapter;
    type Http = http::HttpAdapter;
    type Discovery = mdns::MdnsAdapter;
    type Relay = EspPin;
    type Indicator = EspPin;
    type Clock = time::MonotonicClock;
    type Sink = log_sink::LogEventSink;
}

/// Simulation backends for every port.
#[cfg(not(target_os = "espidf"))]
pub struct SimPlatform;

#[cfg(not(target_os = "espidf"))]
impl Platform for SimPlatform {
    type Link = wifi::WifiAdapter;
    type Session = mqtt::MqttAdapter;
    type Http = http::HttpAdapter;
    type Discovery = mdns::MdnsAdapter;
    type Relay = gpio::GpioOutput<gpio::SimPin>;
    type Indicator = gpio::GpioOutput<gpio::SimPin>;
    type Clock = time::MonotonicClock;
    type Sink = log_sink::LogEventSink;
}
