//! Inbound commands to the application core.
//!
//! Both network surfaces reduce to the same thing: somebody asked for the
//! door to open.  A [`CommandEvent`] is consumed within the tick it was
//! picked up in; nothing is queued across ticks.

use core::fmt;

use super::payload::CommandText;

/// Which surface a command arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Http,
    Mqtt,
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Mqtt => write!(f, "mqtt"),
        }
    }
}

/// An incoming request, already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    Http {
        path: String,
        received_at_ms: u64,
    },
    Mqtt {
        topic: String,
        text: CommandText,
        received_at_ms: u64,
    },
}

impl CommandEvent {
    pub fn source(&self) -> CommandSource {
        match self {
            Self::Http { .. } => CommandSource::Http,
            Self::Mqtt { .. } => CommandSource::Mqtt,
        }
    }

    pub fn received_at_ms(&self) -> u64 {
        match self {
            Self::Http { received_at_ms, .. } | Self::Mqtt { received_at_ms, .. } => {
                *received_at_ms
            }
        }
    }
}
