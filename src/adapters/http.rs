//! Embedded HTTP server adapter.
//!
//! Implements [`HttpPort`].  The ESP-IDF server runs its handlers on its own
//! task; the single wildcard GET handler turns each request into a
//! [`PendingRequest`], queues it for the main loop on an embassy-sync
//! channel and waits on a per-request reply signal.
//!
//! ```text
//!   httpd task                              main loop
//!   ──────────                              ─────────
//!   GET /open ─▶ try_send(pending) ──queue──▶ poll_request()
//!        │                                       │ route + respond()
//!        └── try_take(reply) ◀───reply signal────┘
//! ```
//!
//! If the queue is full or the main loop does not answer within
//! [`REPLY_TIMEOUT_MS`], the handler answers 503 itself and drops its
//! handle on the reply signal.  A late `respond()` then fails with
//! [`HttpError::CallerGone`] and the router skips the actuation.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::info;

use crate::app::ports::{HttpError, HttpPort, HttpRequest, HttpResponse};

/// Requests waiting for the main loop.
pub const REQUEST_QUEUE_DEPTH: usize = 4;

/// How long a handler waits for the main loop before answering 503.
pub const REPLY_TIMEOUT_MS: u64 = 4_000;

/// Handler poll period while waiting for the reply.
#[cfg(target_os = "espidf")]
const REPLY_POLL_MS: u32 = 10;

pub const RESPONSE_UNAVAILABLE: HttpResponse = HttpResponse {
    status: 503,
    content_type: "text/plain",
    body: "Service Unavailable",
};

type RequestQueue = Channel<CriticalSectionRawMutex, PendingRequest, REQUEST_QUEUE_DEPTH>;
type ReplySlot = Signal<CriticalSectionRawMutex, HttpResponse>;

/// A request handed from the server task to the main loop.
pub struct PendingRequest {
    request: HttpRequest,
    reply: Arc<ReplySlot>,
}

/// Answer handle for one request.
pub struct HttpReply(Arc<ReplySlot>);

/// The waiting side of one request.  Dropping it abandons the request.
pub struct ReplyWaiter(Arc<ReplySlot>);

impl ReplyWaiter {
    /// The response, once the main loop has answered.
    pub fn try_take(&self) -> Option<HttpResponse> {
        self.0.try_take()
    }
}

pub struct HttpAdapter {
    #[cfg(target_os = "espidf")]
    server: Option<esp_idf_svc::http::server::EspHttpServer<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim_listening: bool,

    queue: Arc<RequestQueue>,
    port: Option<u16>,
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            server: None,
            #[cfg(not(target_os = "espidf"))]
            sim_listening: false,
            queue: Arc::new(Channel::new()),
            port: None,
        }
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Simulation: a client issues `GET path`.  The returned waiter yields
    /// the response; dropping it simulates a client that gave up.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_request(&self, path: &str) -> Option<ReplyWaiter> {
        if !self.sim_listening {
            return None;
        }
        let slot = Arc::new(ReplySlot::new());
        let pending = PendingRequest {
            request: HttpRequest {
                path: path.to_owned(),
                received_at_ms: crate::adapters::time::uptime_ms(),
            },
            reply: slot.clone(),
        };
        self.queue.try_send(pending).ok()?;
        Some(ReplyWaiter(slot))
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_listen(&mut self, port: u16) -> Result<(), HttpError> {
        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::server::{Configuration, EspHttpServer};
        use esp_idf_svc::io::Write;

        let conf = Configuration {
            http_port: port,
            uri_match_wildcard: true,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&conf).map_err(|e| {
            log::error!("HTTP(espidf): server start failed: {}", e);
            HttpError::Bind
        })?;

        let queue = self.queue.clone();
        server
            .fn_handler::<anyhow::Error, _>("/*", Method::Get, move |req| {
                let slot = Arc::new(ReplySlot::new());
                let pending = PendingRequest {
                    request: HttpRequest {
                        path: req.uri().to_owned(),
                        received_at_ms: crate::adapters::time::uptime_ms(),
                    },
                    reply: slot.clone(),
                };
                let response = match queue.try_send(pending) {
                    Ok(()) => await_reply(&ReplyWaiter(slot)),
                    Err(_) => RESPONSE_UNAVAILABLE,
                };
                req.into_response(
                    response.status,
                    None,
                    &[("Content-Type", response.content_type)],
                )?
                .write_all(response.body.as_bytes())?;
                Ok(())
            })
            .map_err(|_| HttpError::Bind)?;

        self.server = Some(server);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_listen(&mut self, _port: u16) -> Result<(), HttpError> {
        self.sim_listening = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_listening(&self) -> bool {
        self.server.is_some()
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_listening(&self) -> bool {
        self.sim_listening
    }
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Block the handler task until the main loop answers or time runs out.
#[cfg(target_os = "espidf")]
fn await_reply(waiter: &ReplyWaiter) -> HttpResponse {
    let deadline = crate::adapters::time::uptime_ms() + REPLY_TIMEOUT_MS;
    loop {
        if let Some(response) = waiter.try_take() {
            return response;
        }
        if crate::adapters::time::uptime_ms() >= deadline {
            return RESPONSE_UNAVAILABLE;
        }
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(REPLY_POLL_MS);
    }
}

// ───────────────────────────────────────────────────────────────
// HttpPort
// ───────────────────────────────────────────────────────────────

impl HttpPort for HttpAdapter {
    type Reply = HttpReply;

    fn listen(&mut self, port: u16) -> Result<(), HttpError> {
        if self.platform_is_listening() {
            return Ok(());
        }
        self.platform_listen(port)?;
        self.port = Some(port);
        info!("HTTP: server up on :{}", port);
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.platform_is_listening()
    }

    fn poll_request(&mut self) -> Option<(HttpRequest, HttpReply)> {
        let pending = self.queue.try_receive().ok()?;
        Some((pending.request, HttpReply(pending.reply)))
    }

    fn respond(&mut self, reply: HttpReply, response: &HttpResponse) -> Result<(), HttpError> {
        // The waiter holds the only other handle.
        if Arc::strong_count(&reply.0) < 2 {
            return Err(HttpError::CallerGone);
        }
        reply.0.signal(*response);
        Ok(())
    }
}
