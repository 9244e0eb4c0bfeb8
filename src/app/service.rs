//! Controller: the main loop context.
//!
//! [`Controller`] owns every supervisor, the router, the actuator guard and
//! the platform adapters.  One call to [`Controller::tick`] is one iteration
//! of the cooperative loop; nothing runs in between.
//!
//! ```text
//!   tick ─▶ 1. link up?      ── no ─▶ LinkSupervisor::ensure_up (blink)
//!          2. HTTP           ── ≤4 requests ─▶ CommandRouter ─▶ ActuatorGuard
//!          3. session up?    ── no ─▶ SessionSupervisor::ensure_up (retry)
//!          4. MQTT           ── ≤4 messages ─▶ CommandRouter ─▶ ActuatorGuard
//!                            ── flush status queue
//!          5. sleep tick_interval_ms
//! ```

use log::{info, warn};

use crate::config::DeviceConfig;

use super::actuator::{ActuatorGuard, OpenOutcome};
use super::events::AppEvent;
use super::link::LinkSupervisor;
use super::ports::{Clock, DiscoveryPort, EventSink, HttpPort, Platform, SessionOptions};
use super::router::CommandRouter;
use super::session::SessionSupervisor;
use crate::drivers::relay::RelayDriver;
use crate::drivers::status_led::StatusLed;

/// HTTP requests serviced per tick.
pub const MAX_HTTP_PER_TICK: usize = 4;
/// MQTT messages serviced per tick.
pub const MAX_MQTT_PER_TICK: usize = 4;
/// Pause after a failed mDNS announce before the next attempt.
pub const DISCOVERY_RETRY_MS: u64 = 30_000;

/// Concrete adapters handed to [`Controller::new`].
pub struct PlatformParts<P: Platform> {
    pub link: P::Link,
    pub session: P::Session,
    pub http: P::Http,
    pub discovery: P::Discovery,
    pub relay: P::Relay,
    pub indicator: P::Indicator,
    pub clock: P::Clock,
    pub sink: P::Sink,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub http_requests: usize,
    pub mqtt_messages: usize,
    pub published: usize,
    /// `false` when the session could not be restored this tick.
    pub session_up: bool,
}

pub struct Controller<P: Platform> {
    config: DeviceConfig,
    identity: String,
    link: LinkSupervisor<P::Link, P::Indicator>,
    session: SessionSupervisor<P::Session>,
    router: CommandRouter,
    guard: ActuatorGuard<P::Relay>,
    http: P::Http,
    discovery: P::Discovery,
    /// No announce attempt before this instant.
    discovery_retry_at_ms: u64,
    clock: P::Clock,
    sink: P::Sink,
    ticks: u64,
}

impl<P: Platform> Controller<P> {
    /// Assemble the controller.  The relay is driven de-energized here,
    /// before any network activity.
    pub fn new(config: DeviceConfig, identity: &str, parts: PlatformParts<P>) -> Self {
        let relay = RelayDriver::new(parts.relay, config.relay_active_low);
        let guard = ActuatorGuard::new(relay, config.actuation_dwell_ms);

        let led = StatusLed::new(parts.indicator, config.status_led_active_low);
        let link = LinkSupervisor::new(parts.link, led, config.link_blink_ms);

        let status_topic = config.mqtt_status_topic.as_ref().map(|t| t.as_str().to_owned());
        let options = SessionOptions {
            broker_url: config.broker_url(),
            client_id: identity.to_owned(),
            username: config.mqtt_username.as_ref().map(|u| u.as_str().to_owned()),
            password: config.mqtt_password.as_ref().map(|p| p.as_str().to_owned()),
            last_will: status_topic.clone().map(|t| (t, "offline".to_owned())),
            keep_alive_secs: config.mqtt_keep_alive_secs,
        };
        let command_topic = config.mqtt_command_topic.as_str().to_owned();
        let session = SessionSupervisor::new(
            parts.session,
            options,
            command_topic.clone(),
            status_topic,
            config.session_retry_delay_ms,
        );
        let router = CommandRouter::new(command_topic, config.payload_policy.clone());

        Self {
            config,
            identity: identity.to_owned(),
            link,
            session,
            router,
            guard,
            http: parts.http,
            discovery: parts.discovery,
            discovery_retry_at_ms: 0,
            clock: parts.clock,
            sink: parts.sink,
            ticks: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Associate, start serving, and bring the session up.
    ///
    /// Blocks until the link is up.  The session gets one `ensure_up` run;
    /// if the link drops during it, the main loop takes over.
    pub fn boot(&mut self) {
        info!("Controller: booting as '{}'", self.identity);
        if let Err(e) = self
            .link
            .begin(&self.config.wifi_ssid, &self.config.wifi_password)
        {
            warn!("Controller: WiFi begin failed: {} (waiting on driver)", e);
        }
        self.link.ensure_up(&mut self.clock, &mut self.sink);
        self.sync_discovery(true);
        self.ensure_listening();

        let link = &self.link;
        if let Err(e) = self
            .session
            .ensure_up(|| link.sense(), &mut self.clock, &mut self.sink)
        {
            warn!("Controller: session not up after boot: {}", e);
        }
        self.sink.emit(&AppEvent::Booted {
            identity: self.identity.clone(),
        });
    }

    /// One iteration of the main loop, including the trailing sleep.
    pub fn tick(&mut self) -> TickReport {
        self.ticks = self.ticks.wrapping_add(1);
        let mut report = TickReport::default();

        // 1. Link.  The session cannot outlive an outage, even if the
        // transport has not noticed it yet.
        if !self.link.is_up(&mut self.sink) {
            self.session.is_up(false, &mut self.sink);
            self.sync_discovery(false);
            self.link.ensure_up(&mut self.clock, &mut self.sink);
        }
        self.sync_discovery(true);

        // 2. HTTP
        self.ensure_listening();
        for _ in 0..MAX_HTTP_PER_TICK {
            let Some((request, reply)) = self.http.poll_request() else {
                break;
            };
            report.http_requests += 1;
            let outcome = self.router.handle_http(
                &mut self.http,
                request,
                reply,
                &mut self.guard,
                &mut self.clock,
                &mut self.sink,
            );
            self.report_outcome(outcome);
        }

        // 3. Session
        let link_up = self.link.is_up(&mut self.sink);
        report.session_up = self.session.is_up(link_up, &mut self.sink) || {
            let link = &self.link;
            match self
                .session
                .ensure_up(|| link.sense(), &mut self.clock, &mut self.sink)
            {
                Ok(()) => true,
                Err(e) => {
                    warn!("Controller: session deferred: {}", e);
                    false
                }
            }
        };

        // 4. MQTT
        if report.session_up {
            for _ in 0..MAX_MQTT_PER_TICK {
                let Some(message) = self.session.next_message() else {
                    break;
                };
                report.mqtt_messages += 1;
                match message {
                    Ok(command) => {
                        let outcome = self.router.handle_message(
                            command,
                            &mut self.guard,
                            &mut self.clock,
                            &mut self.sink,
                        );
                        self.report_outcome(outcome);
                    }
                    Err(error) => {
                        warn!("MQTT: dropping payload: {}", error);
                        self.sink.emit(&AppEvent::PayloadRejected { error });
                    }
                }
            }
            report.published = self.session.flush();
        }

        // 5. Sleep
        self.clock.delay_ms(self.config.tick_interval_ms);
        report
    }

    /// Run forever.
    pub fn run(&mut self) -> ! {
        self.boot();
        loop {
            self.tick();
        }
    }

    // ── Helpers ───────────────────────────────────────────────

    fn ensure_listening(&mut self) {
        if self.http.is_listening() {
            return;
        }
        match self.http.listen(self.config.http_port) {
            Ok(()) => info!("HTTP: listening on :{}", self.config.http_port),
            Err(e) => warn!("HTTP: listen on :{} failed: {}", self.config.http_port, e),
        }
    }

    fn sync_discovery(&mut self, link_up: bool) {
        if !link_up {
            // A fresh association gets an immediate attempt.
            self.discovery_retry_at_ms = 0;
            if self.discovery.is_active() {
                self.discovery.withdraw();
                self.sink.emit(&AppEvent::DiscoveryChanged { active: false });
            }
            return;
        }
        let now = self.clock.now_ms();
        if self.discovery.is_active() || now < self.discovery_retry_at_ms {
            return;
        }
        match self.discovery.announce(self.config.http_port) {
            Ok(()) => self.sink.emit(&AppEvent::DiscoveryChanged { active: true }),
            Err(e) => {
                warn!(
                    "mDNS: announce failed: {} (retry in {}s)",
                    e,
                    DISCOVERY_RETRY_MS / 1000
                );
                self.discovery_retry_at_ms = now + DISCOVERY_RETRY_MS;
            }
        }
    }

    fn report_outcome(&mut self, outcome: Option<OpenOutcome>) {
        match outcome {
            Some(OpenOutcome::Started) => self.session.queue_status("opened"),
            Some(OpenOutcome::Rejected(_)) => self.session.queue_status("busy"),
            None => {}
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn link(&self) -> &LinkSupervisor<P::Link, P::Indicator> {
        &self.link
    }

    pub fn session(&self) -> &SessionSupervisor<P::Session> {
        &self.session
    }

    pub fn guard(&self) -> &ActuatorGuard<P::Relay> {
        &self.guard
    }

    pub fn http(&self) -> &P::Http {
        &self.http
    }

    pub fn discovery(&self) -> &P::Discovery {
        &self.discovery
    }

    pub fn clock(&self) -> &P::Clock {
        &self.clock
    }

    pub fn sink(&self) -> &P::Sink {
        &self.sink
    }
}
