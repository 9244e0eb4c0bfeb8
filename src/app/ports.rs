//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (radio, broker client, HTTP server, relay pin, storage)
//! implement these traits.  The [`Controller`](super::service::Controller)
//! consumes them via generics, so the domain core never touches hardware
//! directly and every blocking wait goes through [`Clock`].
//!
//! ## Contract notes
//!
//! - **DigitalOutput** writes are assumed infallible; adapters log failures.
//! - **SessionPort::poll_message** hands out the transport's *declared*
//!   length alongside the bytes actually delivered.  Never assume they match.
//! - **HttpPort::respond** reports whether the caller was still waiting.
//! - **ConfigPort** implementations MUST validate before persisting.

use core::net::Ipv4Addr;

use crate::config::DeviceConfig;

pub use embedded_hal::digital::PinState as Level;

// ───────────────────────────────────────────────────────────────
// Digital output (driven adapter: domain → pin)
// ───────────────────────────────────────────────────────────────

/// A single push-pull output line.
pub trait DigitalOutput {
    fn set(&mut self, level: Level);
}

// ───────────────────────────────────────────────────────────────
// Clock (time source + cooperative yield)
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond time and the only way the domain is allowed to wait.
///
/// Tests substitute a fake clock whose `delay_ms` just advances virtual time.
pub trait Clock {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Link port (WiFi station)
// ───────────────────────────────────────────────────────────────

/// Wireless association.  The driver owns the retry cadence; the domain
/// only requests the initial association and then observes.
pub trait LinkPort {
    /// Configure credentials and request association.  Non-blocking.
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), LinkError>;

    fn is_connected(&self) -> bool;

    /// Station address, when associated and DHCP has completed.
    fn ip_address(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Session port (MQTT client)
// ───────────────────────────────────────────────────────────────

/// Connection parameters handed to [`SessionPort::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// `mqtt://host:port` or `mqtts://host:port`.
    pub broker_url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Retained `(topic, payload)` the broker publishes if we vanish.
    pub last_will: Option<(String, String)>,
    pub keep_alive_secs: u16,
}

/// One inbound message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: String,
    /// Bytes actually received.  Not terminated.
    pub payload: Vec<u8>,
    /// Total length announced by the transport.
    pub declared_len: usize,
    /// [`Clock::now_ms`] at the time the adapter queued the message.
    pub received_at_ms: u64,
}

pub trait SessionPort {
    /// One connect attempt.  Blocks at most for the driver's own timeout.
    fn connect(&mut self, options: &SessionOptions) -> Result<(), SessionError>;

    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError>;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionError>;

    /// Next buffered inbound message, if any.  Never blocks.
    fn poll_message(&mut self) -> Option<RawMessage>;

    /// Tear down the transport.  Idempotent.
    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// HTTP port (embedded web server)
// ───────────────────────────────────────────────────────────────

/// A request accepted by the server and waiting for the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request target as received, possibly with a query string.
    pub path: String,
    pub received_at_ms: u64,
}

/// One of the fixed responses the router produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: &'static str,
}

pub trait HttpPort {
    /// Handle used to answer one specific request.
    type Reply;

    fn listen(&mut self, port: u16) -> Result<(), HttpError>;

    fn is_listening(&self) -> bool;

    /// Next pending request, if any.  Never blocks.
    fn poll_request(&mut self) -> Option<(HttpRequest, Self::Reply)>;

    /// Send `response`.  `Err(HttpError::CallerGone)` if nobody is waiting
    /// for it any more.
    fn respond(&mut self, reply: Self::Reply, response: &HttpResponse) -> Result<(), HttpError>;
}

// ───────────────────────────────────────────────────────────────
// Discovery port (mDNS)
// ───────────────────────────────────────────────────────────────

pub trait DiscoveryPort {
    /// Advertise the HTTP service.  Idempotent.
    fn announce(&mut self, http_port: u16) -> Result<(), DiscoveryError>;

    /// Stop advertising.  Idempotent.
    fn withdraw(&mut self);

    fn is_active(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists device configuration.
///
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<DeviceConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Platform bundle
// ───────────────────────────────────────────────────────────────

/// Groups the concrete adapter types so the main loop is a single generic
/// context object instead of a seven-parameter type.
pub trait Platform {
    type Link: LinkPort;
    type Session: SessionPort;
    type Http: HttpPort;
    type Discovery: DiscoveryPort;
    type Relay: DigitalOutput;
    type Indicator: DigitalOutput;
    type Clock: Clock;
    type Sink: EventSink;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`LinkPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Credentials rejected by the driver before association was attempted.
    InvalidCredentials,
    /// The radio driver refused the request.
    Driver,
}

/// Errors from [`SessionPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Broker unreachable or no CONNACK within the driver timeout.
    ConnectFailed,
    /// Broker refused the credentials or client id.
    Refused,
    SubscribeFailed,
    PublishFailed,
    /// Operation requires a live connection.
    NotConnected,
}

/// Errors from [`HttpPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// The server could not bind or register handlers.
    Bind,
    /// The request was abandoned before the reply was sent.
    CallerGone,
}

/// Errors from [`DiscoveryPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryError {
    Unavailable,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::Driver => write!(f, "driver error"),
        }
    }
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::Refused => write!(f, "connection refused"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bind => write!(f, "server bind failed"),
            Self::CallerGone => write!(f, "caller gone"),
        }
    }
}

impl core::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "mDNS unavailable"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
