//! Unified error types for the door controller firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! main loop's error handling uniform.  None of these are fatal: link and
//! session loss are retried indefinitely, rejected actuations and malformed
//! payloads are dropped after being reported through the event sink.
//! All variants are `Copy` so they can be passed around without allocation.

use core::fmt;

use crate::app::actuator::RejectReason;
use crate::app::payload::PayloadError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The WiFi association is down.
    LinkDown,
    /// The broker session is not subscribed.
    SessionDown,
    /// The actuator refused to start a cycle.
    ActuationRejected(RejectReason),
    /// An inbound message could not be decoded into bounded text.
    MalformedPayload(PayloadError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkDown => write!(f, "link down"),
            Self::SessionDown => write!(f, "session down"),
            Self::ActuationRejected(r) => write!(f, "actuation rejected: {r}"),
            Self::MalformedPayload(e) => write!(f, "malformed payload: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl From<RejectReason> for Error {
    fn from(r: RejectReason) -> Self {
        Self::ActuationRejected(r)
    }
}

impl From<PayloadError> for Error {
    fn from(e: PayloadError) -> Self {
        Self::MalformedPayload(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
