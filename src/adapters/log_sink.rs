//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! One tagged line per event.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Booted { identity } => {
                info!("BOOT | id={} | v{}", identity, env!("CARGO_PKG_VERSION"));
            }
            AppEvent::LinkUp { ip } => match ip {
                Some(ip) => info!("LINK | up | ip={}", ip),
                None => info!("LINK | up | ip=pending"),
            },
            AppEvent::LinkLost { outages } => {
                warn!("LINK | lost | outages={}", outages);
            }
            AppEvent::SessionConnecting { attempt } => {
                info!("MQTT | connecting | attempt={}", attempt);
            }
            AppEvent::SessionUp { attempts } => {
                info!("MQTT | subscribed | attempts={}", attempts);
            }
            AppEvent::SessionConnectFailed { error, retry_in_ms } => {
                warn!("MQTT | failed: {} | retry in {}ms", error, retry_in_ms);
            }
            AppEvent::SessionLost => {
                warn!("MQTT | lost");
            }
            AppEvent::DiscoveryChanged { active } => {
                info!("MDNS | {}", if *active { "announced" } else { "withdrawn" });
            }
            AppEvent::ActuationCompleted { source, held_ms } => {
                info!("DOOR | opened via {} | held {}ms", source, held_ms);
            }
            AppEvent::ActuationRejected { source, reason } => {
                info!("DOOR | {} command rejected: {}", source, reason);
            }
            AppEvent::PayloadRejected { error } => {
                warn!("MQTT | payload rejected: {}", error);
            }
            AppEvent::MessageIgnored { topic } => {
                info!("MQTT | ignored message on '{}'", topic);
            }
            AppEvent::HttpServed { path, status } => {
                info!("HTTP | {} {}", status, path);
            }
            AppEvent::HttpAbandoned { path } => {
                warn!("HTTP | caller gone before reply | {}", path);
            }
        }
    }
}
