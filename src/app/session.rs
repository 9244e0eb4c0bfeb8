//! SessionSupervisor: keeps the broker session subscribed.
//!
//! ```text
//!   Disconnected ──connect──▶ Connecting ──ok──▶ Connected ──subscribe──▶ Subscribed
//!        ▲                        │ err                │ err                   │
//!        └────────────────────────┴────────────────────┴──── link/transport lost
//! ```
//!
//! Delivery in either direction is only valid in `Subscribed`.  A failed
//! attempt waits `retry_delay_ms` and tries again, forever; nothing here is
//! fatal.  Attempts are never made while the link is down.

use log::{debug, info, warn};

use crate::error::{Error, Result};

use super::Step;
use super::commands::CommandEvent;
use super::events::AppEvent;
use super::payload::{PAYLOAD_CAPACITY, PayloadError, decode_payload};
use super::ports::{Clock, EventSink, SessionError, SessionOptions, SessionPort};

/// Outbound messages held while the session is down.
pub const OUTBOUND_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Outbound {
    topic: String,
    payload: String,
    retain: bool,
}

pub struct SessionSupervisor<S: SessionPort> {
    session: S,
    options: SessionOptions,
    command_topic: String,
    status_topic: Option<String>,
    retry_delay_ms: u32,
    state: SessionState,
    /// Attempts in the current retry streak.
    attempts: u32,
    /// Successful subscribes since boot.
    established: u32,
    outbound: heapless::Deque<Outbound, OUTBOUND_CAPACITY>,
}

impl<S: SessionPort> SessionSupervisor<S> {
    pub fn new(
        session: S,
        options: SessionOptions,
        command_topic: String,
        status_topic: Option<String>,
        retry_delay_ms: u32,
    ) -> Self {
        Self {
            session,
            options,
            command_topic,
            status_topic,
            retry_delay_ms,
            state: SessionState::Disconnected,
            attempts: 0,
            established: 0,
            outbound: heapless::Deque::new(),
        }
    }

    // ── Liveness ──────────────────────────────────────────────

    /// `true` only while subscribed.  Collapses to `Disconnected` as soon as
    /// the link is down or the transport reports loss.
    pub fn is_up(&mut self, link_up: bool, sink: &mut impl EventSink) -> bool {
        if self.state == SessionState::Subscribed && (!link_up || !self.session.is_connected()) {
            warn!(
                "MQTT: session lost ({})",
                if link_up { "transport" } else { "link down" }
            );
            self.session.disconnect();
            self.state = SessionState::Disconnected;
            sink.emit(&AppEvent::SessionLost);
        }
        self.state == SessionState::Subscribed
    }

    /// One connect + subscribe attempt.  Never attempts while the link is down.
    pub fn step(&mut self, link_up: bool, sink: &mut impl EventSink) -> Step {
        if self.is_up(link_up, sink) {
            return Step::Ready;
        }
        if !link_up {
            return Step::Wait(self.retry_delay_ms);
        }

        self.attempts = self.attempts.wrapping_add(1);
        self.state = SessionState::Connecting;
        sink.emit(&AppEvent::SessionConnecting {
            attempt: self.attempts,
        });
        info!(
            "MQTT: connecting to {} as '{}' (attempt {})",
            self.options.broker_url, self.options.client_id, self.attempts
        );

        if let Err(e) = self.session.connect(&self.options) {
            return self.fail(e, sink);
        }
        self.state = SessionState::Connected;

        if let Err(e) = self.session.subscribe(&self.command_topic) {
            self.session.disconnect();
            return self.fail(e, sink);
        }
        self.state = SessionState::Subscribed;
        self.established = self.established.wrapping_add(1);
        info!("MQTT: subscribed to '{}'", self.command_topic);
        sink.emit(&AppEvent::SessionUp {
            attempts: self.attempts,
        });
        self.attempts = 0;

        if self.status_topic.is_some() {
            self.announce_online();
        }
        Step::Ready
    }

    /// Retry with the fixed delay until subscribed.
    ///
    /// Returns `Err(Error::LinkDown)` if the link drops while retrying, so the
    /// caller can restore the link before the session is tried again.
    pub fn ensure_up(
        &mut self,
        link_up: impl Fn() -> bool,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        loop {
            let up = link_up();
            match self.step(up, sink) {
                Step::Ready => return Ok(()),
                Step::Wait(_) if !up => return Err(Error::LinkDown),
                Step::Wait(ms) => clock.delay_ms(ms),
            }
        }
    }

    fn fail(&mut self, error: SessionError, sink: &mut impl EventSink) -> Step {
        warn!(
            "MQTT: {} (retry in {}ms)",
            error, self.retry_delay_ms
        );
        self.state = SessionState::Disconnected;
        sink.emit(&AppEvent::SessionConnectFailed {
            error,
            retry_in_ms: self.retry_delay_ms,
        });
        Step::Wait(self.retry_delay_ms)
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Next inbound message, decoded into bounded text.
    ///
    /// `None` when nothing is buffered or the session is not subscribed.
    pub fn next_message(&mut self) -> Option<core::result::Result<CommandEvent, PayloadError>> {
        if self.state != SessionState::Subscribed {
            return None;
        }
        let raw = self.session.poll_message()?;
        Some(
            decode_payload::<PAYLOAD_CAPACITY>(&raw.payload, raw.declared_len).map(|text| {
                CommandEvent::Mqtt {
                    topic: raw.topic,
                    text,
                    received_at_ms: raw.received_at_ms,
                }
            }),
        )
    }

    // ── Outbound ──────────────────────────────────────────────

    /// Queue a status message.  No-op without a status topic; when the queue
    /// is full the oldest entry is dropped.
    pub fn queue_status(&mut self, payload: &str) {
        let Some(topic) = &self.status_topic else {
            return;
        };
        let msg = Outbound {
            topic: topic.clone(),
            payload: payload.to_owned(),
            retain: false,
        };
        if self.outbound.is_full() {
            debug!("MQTT: outbound queue full, dropping oldest");
            self.outbound.pop_front();
        }
        let _ = self.outbound.push_back(msg);
    }

    /// Retained `online` goes to the head of the queue so it precedes any
    /// results buffered while we were away.
    fn announce_online(&mut self) {
        let Some(topic) = &self.status_topic else {
            return;
        };
        let msg = Outbound {
            topic: topic.clone(),
            payload: "online".to_owned(),
            retain: true,
        };
        if self.outbound.is_full() {
            self.outbound.pop_back();
        }
        let _ = self.outbound.push_front(msg);
    }

    /// Publish queued messages.  Stops at the first failure, keeping it queued.
    pub fn flush(&mut self) -> usize {
        if self.state != SessionState::Subscribed {
            return 0;
        }
        let mut sent = 0;
        while let Some(msg) = self.outbound.front() {
            if let Err(e) = self
                .session
                .publish(&msg.topic, msg.payload.as_bytes(), msg.retain)
            {
                warn!("MQTT: publish to '{}' failed: {}", msg.topic, e);
                break;
            }
            self.outbound.pop_front();
            sent += 1;
        }
        sent
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn established(&self) -> u32 {
        self.established
    }

    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    pub fn command_topic(&self) -> &str {
        &self.command_topic
    }

    pub fn port(&self) -> &S {
        &self.session
    }
}
