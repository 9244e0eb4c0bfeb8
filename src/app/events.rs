//! Outbound application events.
//!
//! The supervisors, the router and the [`Controller`](super::service::Controller)
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them: log to serial,
//! publish on the status topic, or record them in a test.

use core::net::Ipv4Addr;

use super::actuator::RejectReason;
use super::commands::CommandSource;
use super::payload::PayloadError;
use super::ports::SessionError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Boot finished; carries the device identity.
    Booted { identity: String },

    /// The WiFi association came up.
    LinkUp { ip: Option<Ipv4Addr> },

    /// The WiFi association dropped.
    LinkLost { outages: u32 },

    /// A broker connect attempt is starting.
    SessionConnecting { attempt: u32 },

    /// Connected and subscribed to the command topic.
    SessionUp { attempts: u32 },

    /// A connect or subscribe attempt failed; the next one is `retry_in_ms` away.
    SessionConnectFailed {
        error: SessionError,
        retry_in_ms: u32,
    },

    /// The session collapsed (transport loss or link loss).
    SessionLost,

    /// mDNS service announced or withdrawn.
    DiscoveryChanged { active: bool },

    /// A relay cycle ran to completion and the line is de-energized again.
    ActuationCompleted {
        source: CommandSource,
        held_ms: u64,
    },

    /// An open command was refused.
    ActuationRejected {
        source: CommandSource,
        reason: RejectReason,
    },

    /// An inbound payload failed bounded decoding and was dropped.
    PayloadRejected { error: PayloadError },

    /// An inbound message did not match the topic or payload policy.
    MessageIgnored { topic: String },

    /// An HTTP request was answered.
    HttpServed { path: String, status: u16 },

    /// An HTTP request was abandoned by its caller before we replied.
    HttpAbandoned { path: String },
}
