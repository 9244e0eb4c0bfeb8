//! MQTT client adapter.
//!
//! Implements [`SessionPort`] on top of the ESP-IDF MQTT client.  The client
//! delivers events on its own connection object, which a small pump thread
//! drains: connection state goes into an `AtomicBool`, received messages into
//! a bounded embassy-sync channel that [`SessionPort::poll_message`] reads
//! from the main loop.  Each connect gets a fresh client, pump and flag; dropping the
//! client ends the pump.
//!
//! ```text
//!   esp-mqtt task ──▶ EspMqttConnection ──▶ pump thread ──▶ channel ──▶ poll_message()
//!                                                │
//!                                                └──▶ connected flag ──▶ is_connected()
//! ```
//!
//! Fragmented publishes: only the first chunk is forwarded, tagged with the
//! announced total size, so the bounded decoder rejects it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{info, warn};

use crate::app::payload::PAYLOAD_CAPACITY;
use crate::app::ports::{RawMessage, SessionError, SessionOptions, SessionPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration,
    MqttClientConfiguration, QoS,
};

/// Messages buffered between the pump and the main loop.
pub const INBOUND_CAPACITY: usize = 8;

type Inbound = Channel<CriticalSectionRawMutex, RawMessage, INBOUND_CAPACITY>;

/// How long one connect attempt waits for the broker's CONNACK.
#[cfg(target_os = "espidf")]
const CONNECT_TIMEOUT_MS: u64 = 10_000;

pub struct MqttAdapter {
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,

    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,

    connected: Arc<AtomicBool>,
    inbound: Arc<Inbound>,
    subscriptions: Vec<String>,
}

/// Simulation broker state.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimBroker {
    /// Refuse this many upcoming connect attempts.
    pub refuse_connects: u32,
    pub connects: u32,
    pub published: Vec<(String, Vec<u8>, bool)>,
    pub last_options: Option<SessionOptions>,
}

impl MqttAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            sim: SimBroker::default(),
            connected: Arc::new(AtomicBool::new(false)),
            inbound: Arc::new(Channel::new()),
            subscriptions: Vec::new(),
        }
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim(&self) -> &SimBroker {
        &self.sim
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_mut(&mut self) -> &mut SimBroker {
        &mut self.sim
    }

    /// Simulation: deliver a complete message from the broker.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_deliver(&self, topic: &str, payload: &[u8]) {
        enqueue(
            &self.inbound,
            topic,
            payload,
            payload.len(),
            crate::adapters::time::uptime_ms(),
        );
    }

    /// Simulation: the broker drops us.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_connection(&self) {
        self.connected.store(false, Ordering::Release);
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, options: &SessionOptions) -> Result<(), SessionError> {
        use std::time::Duration;

        let conf = MqttClientConfiguration {
            client_id: Some(options.client_id.as_str()),
            username: options.username.as_deref(),
            password: options.password.as_deref(),
            keep_alive_interval: Some(Duration::from_secs(options.keep_alive_secs.into())),
            lwt: options
                .last_will
                .as_ref()
                .map(|(topic, payload)| LwtConfiguration {
                    topic: topic.as_str(),
                    payload: payload.as_bytes(),
                    qos: QoS::AtLeastOnce,
                    retain: true,
                }),
            ..Default::default()
        };

        let (client, mut conn) =
            EspMqttClient::new(&options.broker_url, &conf).map_err(|e| {
                warn!("MQTT(espidf): client init failed: {}", e);
                SessionError::ConnectFailed
            })?;

        let connected = Arc::new(AtomicBool::new(false));
        self.connected = connected.clone();
        let inbound = self.inbound.clone();
        std::thread::Builder::new()
            .name("mqtt-rx".into())
            .stack_size(6 * 1024)
            .spawn(move || pump(&mut conn, &connected, &inbound))
            .map_err(|_| SessionError::ConnectFailed)?;
        self.client = Some(client);

        let deadline = crate::adapters::time::uptime_ms() + CONNECT_TIMEOUT_MS;
        while !self.connected.load(Ordering::Acquire) {
            if crate::adapters::time::uptime_ms() >= deadline {
                self.platform_disconnect();
                return Err(SessionError::ConnectFailed);
            }
            esp_idf_svc::hal::delay::FreeRtos::delay_ms(50);
        }
        info!("MQTT(espidf): connected to {}", options.broker_url);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, options: &SessionOptions) -> Result<(), SessionError> {
        self.sim.connects += 1;
        self.sim.last_options = Some(options.clone());
        if self.sim.refuse_connects > 0 {
            self.sim.refuse_connects -= 1;
            warn!("MQTT(sim): refusing connect");
            return Err(SessionError::ConnectFailed);
        }
        self.connected.store(true, Ordering::Release);
        info!("MQTT(sim): connected to {}", options.broker_url);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        let client = self.client.as_mut().ok_or(SessionError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtLeastOnce)
            .map(|_| ())
            .map_err(|_| SessionError::SubscribeFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, _topic: &str) -> Result<(), SessionError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), SessionError> {
        let client = self.client.as_mut().ok_or(SessionError::NotConnected)?;
        client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .map(|_| ())
            .map_err(|_| SessionError::PublishFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), SessionError> {
        self.sim
            .published
            .push((topic.to_owned(), payload.to_vec(), retain));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        // Dropping the client stops the esp-mqtt task and ends the pump.
        self.client = None;
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {}
}

impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain one connection's events until its client is dropped.
#[cfg(target_os = "espidf")]
fn pump(conn: &mut EspMqttConnection, connected: &AtomicBool, inbound: &Inbound) {
    while let Ok(event) = conn.next() {
        match event.payload() {
            EventPayload::Connected(_) => connected.store(true, Ordering::Release),
            EventPayload::Disconnected => connected.store(false, Ordering::Release),
            EventPayload::Received {
                topic,
                data,
                details,
                ..
            } => {
                let declared = match details {
                    Details::Complete => data.len(),
                    Details::InitialChunk(chunk) => chunk.total_data_size,
                    Details::SubsequentChunk(_) => continue,
                };
                enqueue(
                    inbound,
                    topic.unwrap_or_default(),
                    data,
                    declared,
                    crate::adapters::time::uptime_ms(),
                );
            }
            EventPayload::Error(e) => warn!("MQTT(espidf): {:?}", e),
            _ => {}
        }
    }
    connected.store(false, Ordering::Release);
    info!("MQTT(espidf): connection closed");
}

/// Copy at most [`PAYLOAD_CAPACITY`] bytes and queue the message.
fn enqueue(
    inbound: &Inbound,
    topic: &str,
    data: &[u8],
    declared_len: usize,
    received_at_ms: u64,
) {
    let kept = &data[..data.len().min(PAYLOAD_CAPACITY)];
    let msg = RawMessage {
        topic: topic.to_owned(),
        payload: kept.to_vec(),
        declared_len,
        received_at_ms,
    };
    if let Err(TrySendError::Full(m)) = inbound.try_send(msg) {
        warn!("MQTT: inbound queue full, dropping message on '{}'", m.topic);
    }
}

// ───────────────────────────────────────────────────────────────
// SessionPort
// ───────────────────────────────────────────────────────────────

impl SessionPort for MqttAdapter {
    fn connect(&mut self, options: &SessionOptions) -> Result<(), SessionError> {
        self.disconnect();
        self.platform_connect(options)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.platform_subscribe(topic)?;
        if !self.subscriptions.iter().any(|t| t == topic) {
            self.subscriptions.push(topic.to_owned());
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.platform_publish(topic, payload, retain)
    }

    fn poll_message(&mut self) -> Option<RawMessage> {
        self.inbound.try_receive().ok()
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.connected.store(false, Ordering::Release);
        self.subscriptions.clear();
        // Anything still queued belongs to the old session.
        self.inbound.clear();
    }
}
