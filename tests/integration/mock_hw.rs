//! Mock platform for integration tests.
//!
//! Every port shares one [`World`] so a test can script the environment
//! (when the link comes up, which requests arrive when, what the broker
//! does) and inspect everything the controller did, after handing the
//! adapters over to it.  Time only moves when the controller waits on the
//! [`FakeClock`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::Rc;

use dooropener::app::events::AppEvent;
use dooropener::app::ports::{
    Clock, DigitalOutput, DiscoveryError, DiscoveryPort, EventSink, HttpError, HttpPort,
    HttpRequest, HttpResponse, Level, LinkError, LinkPort, Platform, RawMessage, SessionError,
    SessionOptions, SessionPort,
};
use dooropener::app::service::{Controller, PlatformParts};
use dooropener::config::DeviceConfig;

pub type Shared = Rc<RefCell<World>>;

// ── Scripted environment ──────────────────────────────────────

#[derive(Debug)]
pub struct ScheduledRequest {
    pub path: String,
    pub at_ms: u64,
    /// `false` simulates a client that gave up before the reply.
    pub caller_waiting: bool,
}

#[derive(Debug, Default)]
pub struct World {
    // clock
    pub now_ms: u64,
    pub delays: Vec<u32>,

    // link
    /// The link is associated from this instant on; `None` means down.
    pub link_up_at: Option<u64>,
    /// The link drops at this instant, if set.
    pub link_down_at: Option<u64>,
    pub link_begins: u32,

    // outputs
    pub relay_writes: Vec<(u64, Level)>,
    pub indicator_writes: Vec<(u64, Level)>,

    // broker
    pub broker_connected: bool,
    /// The transport keeps reporting connected while the link is down.
    pub stale_transport: bool,
    pub refuse_connects: u32,
    pub connects: u32,
    pub disconnects: u32,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String, bool)>,
    pub inbox: VecDeque<RawMessage>,
    pub last_options: Option<SessionOptions>,

    // http
    pub listening_on: Option<u16>,
    pub requests: VecDeque<ScheduledRequest>,
    pub responses: Vec<(String, HttpResponse)>,

    // discovery
    pub discovery_active: bool,
    pub discovery_unavailable: bool,
    pub announce_attempts: u32,
    pub announcements: u32,

    // events
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl World {
    pub fn shared() -> Shared {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn link_is_up(&self) -> bool {
        self.link_up_at.is_some_and(|t| self.now_ms >= t)
            && self.link_down_at.is_none_or(|t| self.now_ms < t)
    }

    /// Drop the link now; it comes back at `back_at_ms`.  The broker
    /// connection does not survive the outage.
    pub fn drop_link_until(&mut self, back_at_ms: u64) {
        self.link_up_at = Some(back_at_ms);
        self.link_down_at = None;
        self.broker_connected = false;
    }

    /// Drop the link now without the transport noticing; it comes back
    /// at `back_at_ms`.
    pub fn drop_link_silently_until(&mut self, back_at_ms: u64) {
        self.link_up_at = Some(back_at_ms);
        self.link_down_at = None;
        self.stale_transport = true;
    }

    /// Queue `GET path` arriving at `at_ms`.
    pub fn request(&mut self, path: &str, at_ms: u64) {
        self.requests.push_back(ScheduledRequest {
            path: path.to_owned(),
            at_ms,
            caller_waiting: true,
        });
    }

    /// Queue a request whose client hangs up before being answered.
    pub fn abandoned_request(&mut self, path: &str, at_ms: u64) {
        self.requests.push_back(ScheduledRequest {
            path: path.to_owned(),
            at_ms,
            caller_waiting: false,
        });
    }

    /// Broker delivers a complete message now.
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        let now = self.now_ms;
        self.deliver_at(topic, payload, now);
    }

    /// Message the adapter queued at `at_ms`.
    pub fn deliver_at(&mut self, topic: &str, payload: &[u8], at_ms: u64) {
        self.inbox.push_back(RawMessage {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
            declared_len: payload.len(),
            received_at_ms: at_ms,
        });
    }

    /// Broker delivers `payload` announcing `declared_len` bytes.
    pub fn deliver_partial(&mut self, topic: &str, payload: &[u8], declared_len: usize) {
        let received_at_ms = self.now_ms;
        self.inbox.push_back(RawMessage {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
            declared_len,
            received_at_ms,
        });
    }

    /// `(energized_at, released_at)` for every relay pulse.
    pub fn relay_pulses(&self, active_low: bool) -> Vec<(u64, u64)> {
        let on_level = if active_low { Level::Low } else { Level::High };
        let mut pulses = Vec::new();
        let mut since = None;
        for &(t, level) in &self.relay_writes {
            match (since, level == on_level) {
                (None, true) => since = Some(t),
                (Some(start), false) => {
                    pulses.push((start, t));
                    since = None;
                }
                _ => {}
            }
        }
        pulses
    }

    /// Last level written to the relay, if any.
    pub fn relay_level(&self) -> Option<Level> {
        self.relay_writes.last().map(|&(_, l)| l)
    }

    pub fn indicator_level(&self) -> Option<Level> {
        self.indicator_writes.last().map(|&(_, l)| l)
    }

    pub fn responses_for(&self, path: &str) -> Vec<HttpResponse> {
        self.responses
            .iter()
            .filter(|(p, _)| p == path)
            .map(|&(_, r)| r)
            .collect()
    }

    pub fn count_events(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

// ── Ports ─────────────────────────────────────────────────────

pub struct FakeClock(pub Shared);

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.0.borrow().now_ms
    }

    fn delay_ms(&mut self, ms: u32) {
        let mut w = self.0.borrow_mut();
        w.now_ms += u64::from(ms);
        w.delays.push(ms);
    }
}

pub struct MockLink(pub Shared);

impl LinkPort for MockLink {
    fn begin(&mut self, ssid: &str, _password: &str) -> Result<(), LinkError> {
        if ssid.is_empty() {
            return Err(LinkError::InvalidCredentials);
        }
        self.0.borrow_mut().link_begins += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.0.borrow().link_is_up()
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.is_connected().then_some(Ipv4Addr::new(10, 0, 0, 42))
    }
}

pub struct MockSession(pub Shared);

impl SessionPort for MockSession {
    fn connect(&mut self, options: &SessionOptions) -> Result<(), SessionError> {
        let mut w = self.0.borrow_mut();
        w.last_options = Some(options.clone());
        if !w.link_is_up() {
            return Err(SessionError::ConnectFailed);
        }
        if w.refuse_connects > 0 {
            w.refuse_connects -= 1;
            return Err(SessionError::Refused);
        }
        w.connects += 1;
        w.broker_connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let w = self.0.borrow();
        w.broker_connected && (w.stale_transport || w.link_is_up())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        let mut w = self.0.borrow_mut();
        if !w.broker_connected {
            return Err(SessionError::NotConnected);
        }
        w.subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionError> {
        let mut w = self.0.borrow_mut();
        if !w.broker_connected {
            return Err(SessionError::NotConnected);
        }
        let text = String::from_utf8_lossy(payload).into_owned();
        w.published.push((topic.to_owned(), text, retain));
        Ok(())
    }

    fn poll_message(&mut self) -> Option<RawMessage> {
        self.0.borrow_mut().inbox.pop_front()
    }

    fn disconnect(&mut self) {
        let mut w = self.0.borrow_mut();
        if w.broker_connected {
            w.disconnects += 1;
        }
        w.broker_connected = false;
    }
}

pub struct MockReply {
    path: String,
    caller_waiting: bool,
}

pub struct MockHttp(pub Shared);

impl HttpPort for MockHttp {
    type Reply = MockReply;

    fn listen(&mut self, port: u16) -> Result<(), HttpError> {
        self.0.borrow_mut().listening_on = Some(port);
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.0.borrow().listening_on.is_some()
    }

    /// Only hands out requests that have "arrived" by now.
    fn poll_request(&mut self) -> Option<(HttpRequest, MockReply)> {
        let mut w = self.0.borrow_mut();
        let now = w.now_ms;
        if w.requests.front()?.at_ms > now {
            return None;
        }
        let next = w.requests.pop_front()?;
        let request = HttpRequest {
            path: next.path.clone(),
            received_at_ms: next.at_ms,
        };
        let reply = MockReply {
            path: next.path,
            caller_waiting: next.caller_waiting,
        };
        Some((request, reply))
    }

    fn respond(&mut self, reply: MockReply, response: &HttpResponse) -> Result<(), HttpError> {
        if !reply.caller_waiting {
            return Err(HttpError::CallerGone);
        }
        self.0.borrow_mut().responses.push((reply.path, *response));
        Ok(())
    }
}

pub struct MockDiscovery(pub Shared);

impl DiscoveryPort for MockDiscovery {
    fn announce(&mut self, _http_port: u16) -> Result<(), DiscoveryError> {
        let mut w = self.0.borrow_mut();
        w.announce_attempts += 1;
        if w.discovery_unavailable {
            return Err(DiscoveryError::Unavailable);
        }
        if !w.discovery_active {
            w.announcements += 1;
        }
        w.discovery_active = true;
        Ok(())
    }

    fn withdraw(&mut self) {
        self.0.borrow_mut().discovery_active = false;
    }

    fn is_active(&self) -> bool {
        self.0.borrow().discovery_active
    }
}

pub struct RecordingRelay(pub Shared);

impl DigitalOutput for RecordingRelay {
    fn set(&mut self, level: Level) {
        let mut w = self.0.borrow_mut();
        let now = w.now_ms;
        w.relay_writes.push((now, level));
    }
}

pub struct RecordingIndicator(pub Shared);

impl DigitalOutput for RecordingIndicator {
    fn set(&mut self, level: Level) {
        let mut w = self.0.borrow_mut();
        let now = w.now_ms;
        w.indicator_writes.push((now, level));
    }
}

pub struct RecordingSink(pub Shared);

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.0.borrow_mut().events.push(event.clone());
    }
}

// ── Platform ──────────────────────────────────────────────────

pub struct MockPlatform;

impl Platform for MockPlatform {
    type Link = MockLink;
    type Session = MockSession;
    type Http = MockHttp;
    type Discovery = MockDiscovery;
    type Relay = RecordingRelay;
    type Indicator = RecordingIndicator;
    type Clock = FakeClock;
    type Sink = RecordingSink;
}

pub fn parts(world: &Shared) -> PlatformParts<MockPlatform> {
    PlatformParts {
        link: MockLink(world.clone()),
        session: MockSession(world.clone()),
        http: MockHttp(world.clone()),
        discovery: MockDiscovery(world.clone()),
        relay: RecordingRelay(world.clone()),
        indicator: RecordingIndicator(world.clone()),
        clock: FakeClock(world.clone()),
        sink: RecordingSink(world.clone()),
    }
}

/// Defaults plus a status topic, so published results can be checked.
pub fn test_config() -> DeviceConfig {
    let mut config = DeviceConfig::default();
    config.wifi_ssid = heapless::String::try_from("testnet").unwrap();
    config.wifi_password = heapless::String::try_from("password123").unwrap();
    config.mqtt_command_topic = heapless::String::try_from("door/open").unwrap();
    config.mqtt_status_topic = Some(heapless::String::try_from("door/status").unwrap());
    config
}

pub const IDENTITY: &str = "door-efcafe";

pub fn controller(config: DeviceConfig, world: &Shared) -> Controller<MockPlatform> {
    Controller::new(config, IDENTITY, parts(world))
}

/// A controller that has booted with the link already up.
pub fn booted() -> (Controller<MockPlatform>, Shared) {
    let world = World::shared();
    world.borrow_mut().link_up_at = Some(0);
    let mut ctl = controller(test_config(), &world);
    ctl.boot();
    (ctl, world)
}
