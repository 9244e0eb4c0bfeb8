//! CommandRouter: maps HTTP requests and MQTT messages onto the actuator.
//!
//! | Method + path | Status | Body              | Side effect        |
//! |---------------|--------|-------------------|--------------------|
//! | GET /open     | 200    | `OK`              | `try_open()`       |
//! | GET /         | 200    | `Hello World`     | none               |
//! | anything else | 404    | `404 - Not Found` | none               |
//!
//! The HTTP reply is sent before the cycle runs, so an HTTP caller always
//! sees 200 for `/open`, even when the open is rejected.  A reply that
//! cannot be delivered (caller already gone) does not actuate.
//!
//! The router holds configuration only; all state lives in the guard.

use log::{debug, info, warn};

use crate::config::PayloadPolicy;

use super::actuator::{ActuatorGuard, OpenOutcome};
use super::commands::{CommandEvent, CommandSource};
use super::events::AppEvent;
use super::ports::{Clock, DigitalOutput, EventSink, HttpPort, HttpRequest, HttpResponse};

const TEXT_PLAIN: &str = "text/plain";

pub const RESPONSE_OPEN: HttpResponse = HttpResponse {
    status: 200,
    content_type: TEXT_PLAIN,
    body: "OK",
};

pub const RESPONSE_INDEX: HttpResponse = HttpResponse {
    status: 200,
    content_type: TEXT_PLAIN,
    body: "Hello World",
};

pub const RESPONSE_NOT_FOUND: HttpResponse = HttpResponse {
    status: 404,
    content_type: TEXT_PLAIN,
    body: "404 - Not Found",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRoute {
    Open,
    Index,
    NotFound,
}

impl HttpRoute {
    pub fn response(self) -> HttpResponse {
        match self {
            Self::Open => RESPONSE_OPEN,
            Self::Index => RESPONSE_INDEX,
            Self::NotFound => RESPONSE_NOT_FOUND,
        }
    }
}

/// Match a request target by path.  Query string and fragment are ignored.
pub fn route_http(target: &str) -> HttpRoute {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    match path {
        "/open" => HttpRoute::Open,
        "/" => HttpRoute::Index,
        _ => HttpRoute::NotFound,
    }
}

pub struct CommandRouter {
    command_topic: String,
    policy: PayloadPolicy,
}

impl CommandRouter {
    pub fn new(command_topic: String, policy: PayloadPolicy) -> Self {
        Self {
            command_topic,
            policy,
        }
    }

    /// Answer one HTTP request, then run the open command if it was `/open`.
    ///
    /// Returns the actuation outcome, or `None` when nothing was attempted.
    pub fn handle_http<H: HttpPort, R: DigitalOutput>(
        &self,
        http: &mut H,
        request: HttpRequest,
        reply: H::Reply,
        guard: &mut ActuatorGuard<R>,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) -> Option<OpenOutcome> {
        let route = route_http(&request.path);
        let response = route.response();

        if let Err(e) = http.respond(reply, &response) {
            warn!("HTTP: {} {} not delivered: {}", response.status, request.path, e);
            sink.emit(&AppEvent::HttpAbandoned { path: request.path });
            return None;
        }
        debug!("HTTP: {} -> {}", request.path, response.status);
        sink.emit(&AppEvent::HttpServed {
            path: request.path,
            status: response.status,
        });

        (route == HttpRoute::Open)
            .then(|| Self::open(CommandSource::Http, request.received_at_ms, guard, clock, sink))
    }

    /// Apply the topic and payload policy to one decoded message.
    pub fn handle_message<R: DigitalOutput>(
        &self,
        command: CommandEvent,
        guard: &mut ActuatorGuard<R>,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) -> Option<OpenOutcome> {
        let CommandEvent::Mqtt {
            topic,
            text,
            received_at_ms,
        } = command
        else {
            return None;
        };

        info!("MQTT: message on '{}': '{}'", topic, text.as_str());
        if topic != self.command_topic || !self.accepts(text.as_str()) {
            sink.emit(&AppEvent::MessageIgnored { topic });
            return None;
        }
        Some(Self::open(CommandSource::Mqtt, received_at_ms, guard, clock, sink))
    }

    /// Whether `text` counts as an open command under the configured policy.
    pub fn accepts(&self, text: &str) -> bool {
        match &self.policy {
            PayloadPolicy::AnyMessage => true,
            PayloadPolicy::Exact(expected) => text.trim() == expected.as_str().trim(),
        }
    }

    fn open<R: DigitalOutput>(
        source: CommandSource,
        requested_at_ms: u64,
        guard: &mut ActuatorGuard<R>,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) -> OpenOutcome {
        let outcome = guard.try_open(requested_at_ms, clock);
        match outcome {
            OpenOutcome::Started => {
                let held_ms = guard.last_cycle().map_or(0, |w| w.held_ms());
                sink.emit(&AppEvent::ActuationCompleted { source, held_ms });
            }
            OpenOutcome::Rejected(reason) => {
                sink.emit(&AppEvent::ActuationRejected { source, reason });
            }
        }
        outcome
    }
}
