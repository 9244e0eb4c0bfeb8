//! mDNS service advertisement adapter.
//!
//! Implements [`DiscoveryPort`]: advertises `_http._tcp` on the configured
//! HTTP port under the device identity, with a TXT record for the firmware
//! version.  Uses the `esp-idf-svc` mDNS wrapper on ESP-IDF and is a
//! simulation on other targets.
//!
//! Lifecycle is tied to WiFi: announced on link up, withdrawn on link loss.
//! Both directions are idempotent.

use log::info;

use crate::app::ports::{DiscoveryError, DiscoveryPort};

const MDNS_SERVICE_TYPE: &str = "_http";
const MDNS_SERVICE_PROTO: &str = "_tcp";

/// mDNS advertisement adapter.
pub struct MdnsAdapter {
    hostname: String,
    active: bool,
    announcements: u32,
    #[cfg(target_os = "espidf")]
    mdns: Option<esp_idf_svc::mdns::EspMdns>,
}

impl MdnsAdapter {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_owned(),
            active: false,
            announcements: 0,
            #[cfg(target_os = "espidf")]
            mdns: None,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Number of successful announcements since construction.
    pub fn announcements(&self) -> u32 {
        self.announcements
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self, port: u16) -> Result<(), DiscoveryError> {
        use esp_idf_svc::mdns::EspMdns;

        if self.mdns.is_none() {
            let mdns = EspMdns::take().map_err(|e| {
                log::error!("mDNS: take failed ({})", e);
                DiscoveryError::Unavailable
            })?;
            self.mdns = Some(mdns);
        }
        let Some(mdns) = self.mdns.as_mut() else {
            return Err(DiscoveryError::Unavailable);
        };
        mdns.set_hostname(&self.hostname)
            .map_err(|_| DiscoveryError::Unavailable)?;
        mdns.set_instance_name(&self.hostname)
            .map_err(|_| DiscoveryError::Unavailable)?;
        mdns.add_service(
            Some(&self.hostname),
            MDNS_SERVICE_TYPE,
            MDNS_SERVICE_PROTO,
            port,
            &[("version", env!("CARGO_PKG_VERSION"))],
        )
        .map_err(|_| DiscoveryError::Unavailable)?;
        info!(
            "mDNS(espidf): registered {}.local {}.{}:{}",
            self.hostname, MDNS_SERVICE_TYPE, MDNS_SERVICE_PROTO, port
        );
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self, port: u16) -> Result<(), DiscoveryError> {
        info!(
            "mDNS(sim): registered {}.local {}.{}:{} v={}",
            self.hostname,
            MDNS_SERVICE_TYPE,
            MDNS_SERVICE_PROTO,
            port,
            env!("CARGO_PKG_VERSION")
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) {
        if let Some(mdns) = self.mdns.as_mut() {
            let _ = mdns.remove_service(MDNS_SERVICE_TYPE, MDNS_SERVICE_PROTO);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) {
        info!("mDNS(sim): unregistered");
    }
}

impl DiscoveryPort for MdnsAdapter {
    fn announce(&mut self, http_port: u16) -> Result<(), DiscoveryError> {
        if self.active {
            return Ok(());
        }
        self.platform_start(http_port)?;
        self.active = true;
        self.announcements = self.announcements.wrapping_add(1);
        Ok(())
    }

    fn withdraw(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("mDNS: stopped");
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
