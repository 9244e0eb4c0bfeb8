//! Device configuration parameters
//!
//! Every tunable of the door controller: pins, network credentials, broker
//! endpoint and timings.  Defaults are compile-time constants; site-specific
//! values and secrets can be injected at build time through `DOOR_*`
//! environment variables, and the whole struct can be replaced at runtime
//! by a blob stored in NVS (see [`NvsAdapter`](crate::adapters::nvs::NvsAdapter)).

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::pins;

pub type Ssid = heapless::String<32>;
pub type Passphrase = heapless::String<64>;
pub type HostName = heapless::String<64>;
pub type Topic = heapless::String<64>;
pub type Credential = heapless::String<32>;

/// Upper bound on the relay dwell; longer holds would cook cheap strike coils.
pub const MAX_DWELL_MS: u32 = 10_000;
/// Upper bound on the indicator half-period.
pub const MAX_BLINK_MS: u32 = 2_000;

/// How an MQTT message on the command topic is turned into an open command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadPolicy {
    /// Any message on the command topic opens the door.
    AnyMessage,
    /// Only a payload equal to this text (surrounding whitespace ignored).
    Exact(heapless::String<32>),
}

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Hardware ---
    pub relay_gpio: i32,
    pub relay_active_low: bool,
    pub status_led_gpio: i32,
    pub status_led_active_low: bool,

    // --- WiFi ---
    pub wifi_ssid: Ssid,
    pub wifi_password: Passphrase,

    // --- HTTP ---
    pub http_port: u16,

    // --- MQTT ---
    pub mqtt_host: HostName,
    pub mqtt_port: u16,
    /// Use `mqtts://` (typically port 8883).
    pub mqtt_tls: bool,
    pub mqtt_username: Option<Credential>,
    pub mqtt_password: Option<Credential>,
    /// Topic whose messages trigger the door.
    pub mqtt_command_topic: Topic,
    /// Optional topic for `online`/`offline` and actuation results.
    pub mqtt_status_topic: Option<Topic>,
    pub mqtt_keep_alive_secs: u16,
    pub payload_policy: PayloadPolicy,

    // --- Identity ---
    /// Prefix of the MAC-derived identity, e.g. `door` → `door-a1b2c3`.
    pub identity_prefix: heapless::String<12>,

    // --- Timing ---
    /// How long the relay stays energized per actuation (milliseconds).
    pub actuation_dwell_ms: u32,
    /// Delay between broker connect attempts (milliseconds).
    pub session_retry_delay_ms: u32,
    /// Main loop sleep between ticks (milliseconds).
    pub tick_interval_ms: u32,
    /// Status indicator half-period while the link is down (milliseconds).
    pub link_blink_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // Hardware
            relay_gpio: pins::RELAY_GPIO,
            relay_active_low: pins::RELAY_ACTIVE_LOW,
            status_led_gpio: pins::STATUS_LED_GPIO,
            status_led_active_low: pins::STATUS_LED_ACTIVE_LOW,

            // WiFi
            wifi_ssid: bounded(option_env!("DOOR_WIFI_SSID").unwrap_or("IOT")),
            wifi_password: bounded(option_env!("DOOR_WIFI_PASSWORD").unwrap_or("")),

            // HTTP
            http_port: 9292,

            // MQTT
            mqtt_host: bounded(option_env!("DOOR_MQTT_HOST").unwrap_or("192.168.10.2")),
            mqtt_port: 1883,
            mqtt_tls: false,
            mqtt_username: option_env!("DOOR_MQTT_USER").map(bounded),
            mqtt_password: option_env!("DOOR_MQTT_PASSWORD").map(bounded),
            mqtt_command_topic: bounded(option_env!("DOOR_MQTT_TOPIC").unwrap_or("door/open")),
            mqtt_status_topic: None,
            mqtt_keep_alive_secs: 30,
            payload_policy: PayloadPolicy::AnyMessage,

            // Identity
            identity_prefix: bounded("door"),

            // Timing
            actuation_dwell_ms: 1500,
            session_retry_delay_ms: 5000,
            tick_interval_ms: 500,
            link_blink_ms: 200,
        }
    }
}

impl DeviceConfig {
    /// Broker URL in the form expected by the MQTT client.
    pub fn broker_url(&self) -> String {
        let scheme = if self.mqtt_tls { "mqtts" } else { "mqtt" };
        format!("{}://{}:{}", scheme, self.mqtt_host, self.mqtt_port)
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ssid(&self.wifi_ssid)?;
        validate_password(&self.wifi_password)?;

        if self.http_port == 0 {
            return Err(ConfigError::ValidationFailed("http_port must be non-zero"));
        }
        if self.mqtt_host.is_empty() {
            return Err(ConfigError::ValidationFailed("mqtt_host must be set"));
        }
        if self.mqtt_port == 0 {
            return Err(ConfigError::ValidationFailed("mqtt_port must be non-zero"));
        }
        validate_topic(&self.mqtt_command_topic)?;
        if let Some(status) = &self.mqtt_status_topic {
            validate_topic(status)?;
            if status == &self.mqtt_command_topic {
                return Err(ConfigError::ValidationFailed(
                    "mqtt_status_topic must differ from the command topic",
                ));
            }
        }
        if let PayloadPolicy::Exact(text) = &self.payload_policy {
            if text.trim().is_empty() {
                return Err(ConfigError::ValidationFailed("payload_policy text is empty"));
            }
        }
        if self.identity_prefix.is_empty() || !is_printable_ascii(&self.identity_prefix) {
            return Err(ConfigError::ValidationFailed("identity_prefix must be printable ASCII"));
        }

        if self.actuation_dwell_ms == 0 || self.actuation_dwell_ms > MAX_DWELL_MS {
            return Err(ConfigError::ValidationFailed("actuation_dwell_ms must be 1–10000"));
        }
        if self.session_retry_delay_ms == 0 {
            return Err(ConfigError::ValidationFailed("session_retry_delay_ms must be non-zero"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be non-zero"));
        }
        if self.link_blink_ms == 0 || self.link_blink_ms > MAX_BLINK_MS {
            return Err(ConfigError::ValidationFailed("link_blink_ms must be 1–2000"));
        }
        Ok(())
    }
}

/// Stored config if present and valid, compile-time defaults otherwise.
pub fn load_or_default(store: &impl ConfigPort) -> DeviceConfig {
    match store.load() {
        Ok(cfg) => cfg,
        Err(ConfigError::NotFound) => {
            info!("Config: nothing stored, using defaults");
            DeviceConfig::default()
        }
        Err(e) => {
            warn!("Config: stored config unusable ({}), using defaults", e);
            DeviceConfig::default()
        }
    }
}

/// Every byte in `0x20..=0x7E` (space through tilde).
fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Copy `s` into a fixed-capacity string.  Oversized input yields an empty
/// string, which `validate()` then reports instead of silently truncating.
fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    if out.push_str(s).is_err() {
        out.clear();
    }
    out
}

fn validate_ssid(ssid: &str) -> Result<(), ConfigError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConfigError::ValidationFailed(
            "wifi_ssid must be 1-32 printable ASCII bytes",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConfigError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConfigError::ValidationFailed(
            "wifi_password must be 8-64 bytes for WPA2, or empty for open",
        ));
    }
    Ok(())
}

fn validate_topic(topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::ValidationFailed("mqtt topic must be set"));
    }
    if topic.contains(['+', '#']) {
        return Err(ConfigError::ValidationFailed("mqtt topic must not contain wildcards"));
    }
    Ok(())
}
