//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`].  The adapter only starts the association; from
//! then on the ESP-IDF driver owns the link, and a system event subscription
//! re-issues `esp_wifi_connect()` whenever the station is dropped.  The
//! [`LinkSupervisor`](crate::app::link::LinkSupervisor) just polls.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation; the link state is set by the caller.

use core::net::Ipv4Addr;

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{LinkError, LinkPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::{EspSubscription, EspSystemEventLoop, System},
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    sys::EspError,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent},
};

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(target_os = "espidf")]
    sysloop: EspSystemEventLoop,
    #[cfg(target_os = "espidf")]
    reconnect: Option<EspSubscription<'static, System>>,

    #[cfg(not(target_os = "espidf"))]
    sim_connected: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_ip: Ipv4Addr,

    ssid: heapless::String<32>,
    started: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        Ok(Self {
            wifi,
            sysloop,
            reconnect: None,
            ssid: heapless::String::new(),
            started: false,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            sim_connected: false,
            sim_ip: Ipv4Addr::new(192, 168, 4, 2),
            ssid: heapless::String::new(),
            started: false,
        }
    }

    /// Whether `begin` has been accepted.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    /// Simulation: drop or restore the association.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_connected(&mut self, connected: bool) {
        self.sim_connected = connected && self.started;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: ssid.try_into().map_err(|()| LinkError::InvalidCredentials)?,
            password: password
                .try_into()
                .map_err(|()| LinkError::InvalidCredentials)?,
            auth_method,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|e| {
                warn!("WiFi(espidf): set_configuration failed: {}", e);
                LinkError::Driver
            })?;

        // Keep the station associated without involving the main loop.
        let subscription = self
            .sysloop
            .subscribe::<WifiEvent, _>(|event| {
                if matches!(event, WifiEvent::StaDisconnected(..)) {
                    // SAFETY: the WiFi driver is started and lives as long
                    // as the adapter that owns this subscription.
                    unsafe {
                        esp_idf_svc::sys::esp_wifi_connect();
                    }
                }
            })
            .map_err(|_| LinkError::Driver)?;
        self.reconnect = Some(subscription);

        self.wifi.start().map_err(|_| LinkError::Driver)?;
        self.wifi.connect().map_err(|_| LinkError::Driver)?;
        info!("WiFi(espidf): STA started");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin(&mut self, _ssid: &str, _password: &str) -> Result<(), LinkError> {
        self.sim_connected = true;
        info!("WiFi(sim): associated");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_connected
    }

    #[cfg(target_os = "espidf")]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        self.sim_connected.then_some(self.sim_ip)
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// LinkPort
// ───────────────────────────────────────────────────────────────

impl LinkPort for WifiAdapter {
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
        if ssid.is_empty() || password.len() > 64 {
            return Err(LinkError::InvalidCredentials);
        }
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|()| LinkError::InvalidCredentials)?;
        self.platform_begin(ssid, password)?;
        self.started = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.started && self.platform_is_connected()
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        if !self.is_connected() {
            return None;
        }
        self.platform_ip()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
