//! Secure MQTT client adapter.
//!
//! Implements [`BrokerPort`] over mutual-TLS MQTT.
//!
//! The client delivers messages from its own task.  They are copied into a
//! bounded [`InboundQueue`] and handed to the loop only when it calls
//! [`BrokerPort::poll`], so the application core never sees a callback
//! from another thread.
//!
//! ```text
//!  esp-mqtt task ──push──▶ InboundQueue ──poll()──▶ loop thread
//! ```
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`
//!   with client certificate and key from the credential store.
//! - **all other targets**: an in-process broker simulation with
//!   injection and inspection hooks for host-side tests.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::app::ports::{BrokerPort, QoS, TlsCredentials};
use crate::error::{PublishError, SessionError};
use crate::topics::{TopicString, MAX_TOPIC_LEN};

/// Messages buffered between two polls.
pub const INBOUND_CAPACITY: usize = 8;

/// Largest inbound payload kept; anything larger is dropped.
pub const MAX_INBOUND_LEN: usize = 512;

// ───────────────────────────────────────────────────────────────
// Inbound queue
// ───────────────────────────────────────────────────────────────

pub struct InboundMessage {
    pub topic: TopicString,
    pub payload: heapless::Vec<u8, MAX_INBOUND_LEN>,
}

/// Fixed-capacity FIFO.  When full, the newest message is dropped.
pub struct InboundQueue {
    messages: heapless::Deque<InboundMessage, INBOUND_CAPACITY>,
    dropped: u32,
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundQueue {
    pub const fn new() -> Self {
        Self {
            messages: heapless::Deque::new(),
            dropped: 0,
        }
    }

    /// Returns `false` if the message was dropped.
    pub fn push(&mut self, topic: &str, payload: &[u8]) -> bool {
        if topic.len() > MAX_TOPIC_LEN || payload.len() > MAX_INBOUND_LEN {
            warn!(
                "MQTT: dropping oversized message on '{}' ({} bytes)",
                topic,
                payload.len()
            );
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        let mut msg = InboundMessage {
            topic: TopicString::new(),
            payload: heapless::Vec::new(),
        };
        // Both fit: checked above.
        let _ = msg.topic.push_str(topic);
        let _ = msg.payload.extend_from_slice(payload);

        if self.messages.push_back(msg).is_err() {
            warn!("MQTT: inbound queue full, dropping message on '{}'", topic);
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        true
    }

    pub fn pop(&mut self) -> Option<InboundMessage> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Messages dropped since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// State shared with the client task.
#[derive(Default)]
struct Shared {
    connected: bool,
    inbound: InboundQueue,
}

// ───────────────────────────────────────────────────────────────
// Adapter configuration
// ───────────────────────────────────────────────────────────────

/// Endpoint and client parameters fixed for the badge's lifetime.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub url: heapless::String<128>,
    pub client_id: heapless::String<64>,
    pub keepalive_secs: u32,
    pub handshake_timeout_ms: u32,
}

// ───────────────────────────────────────────────────────────────
// MQTT adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter {
    settings: MqttSettings,
    shared: Arc<Mutex<Shared>>,
    #[cfg(target_os = "espidf")]
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    /// PEM buffers handed to mbedTLS, which keeps the pointers.
    #[cfg(target_os = "espidf")]
    pem: Option<(&'static [u8], &'static [u8])>,
    /// Simulation: make the next handshake fail with this error.
    #[cfg(not(target_os = "espidf"))]
    sim_open_error: Option<SessionError>,
    /// Simulation: reject publishes while set.
    #[cfg(not(target_os = "espidf"))]
    sim_reject_publish: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_opens: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_subscriptions: Vec<String>,
    #[cfg(not(target_os = "espidf"))]
    sim_published: Vec<(String, Vec<u8>)>,
}

impl MqttAdapter {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            settings,
            shared: Arc::new(Mutex::new(Shared::default())),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            pem: None,
            #[cfg(not(target_os = "espidf"))]
            sim_open_error: None,
            #[cfg(not(target_os = "espidf"))]
            sim_reject_publish: false,
            #[cfg(not(target_os = "espidf"))]
            sim_opens: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_subscriptions: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_published: Vec::new(),
        }
    }

    pub fn settings(&self) -> &MqttSettings {
        &self.settings
    }

    /// Messages dropped by the inbound queue since boot.
    pub fn dropped_inbound(&self) -> u32 {
        self.shared.lock().map_or(0, |s| s.inbound.dropped())
    }

    fn set_connected(&self, connected: bool) {
        if let Ok(mut s) = self.shared.lock() {
            s.connected = connected;
            if !connected {
                s.inbound.clear();
            }
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_open(&mut self, credentials: &TlsCredentials) -> Result<(), SessionError> {
        use core::time::Duration;
        use embedded_svc::mqtt::client::{Details, EventPayload};
        use esp_idf_svc::mqtt::client::{EspMqttClient, MqttClientConfiguration};
        use esp_idf_svc::tls::X509;

        // Leak the PEM material once; every later session reuses it.
        let (cert, key) = match self.pem {
            Some(pem) => pem,
            None => {
                let cert: &'static [u8] = Box::leak(credentials.certificate.to_vec().into_boxed_slice());
                let key: &'static [u8] = Box::leak(credentials.private_key.to_vec().into_boxed_slice());
                self.pem = Some((cert, key));
                (cert, key)
            }
        };

        let conf = MqttClientConfiguration {
            client_id: Some(self.settings.client_id.as_str()),
            keep_alive_interval: Some(Duration::from_secs(u64::from(self.settings.keepalive_secs))),
            client_certificate: Some(X509::pem_until_nul(cert)),
            private_key: Some(X509::pem_until_nul(key)),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };

        let shared = Arc::clone(&self.shared);
        let client = EspMqttClient::new_cb(self.settings.url.as_str(), &conf, move |event| {
            let Ok(mut s) = shared.lock() else {
                return;
            };
            match event.payload() {
                EventPayload::Connected(_) => {
                    s.connected = true;
                }
                EventPayload::Disconnected => {
                    s.connected = false;
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    details: Details::Complete,
                    ..
                } => {
                    s.inbound.push(topic, data);
                }
                EventPayload::Received { .. } => {
                    // Fragmented payloads exceed the inbound buffer anyway.
                    warn!("MQTT: dropping fragmented message");
                }
                EventPayload::Error(e) => {
                    warn!("MQTT: client error: {:?}", e);
                }
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {:?}", e);
            SessionError::Rejected
        })?;
        self.client = Some(client);

        // Wait for CONNACK.
        let mut waited = 0;
        while waited < self.settings.handshake_timeout_ms {
            if self.platform_is_open() {
                return Ok(());
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
            waited += 50;
        }
        self.client = None;
        Err(SessionError::Timeout)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_open(&mut self, _credentials: &TlsCredentials) -> Result<(), SessionError> {
        self.sim_opens = self.sim_opens.wrapping_add(1);
        if let Some(e) = self.sim_open_error.take() {
            warn!("MQTT(sim): simulated handshake failure: {}", e);
            return Err(e);
        }
        self.sim_subscriptions.clear();
        self.set_connected(true);
        info!("MQTT(sim): connected to {} as '{}'", self.settings.url, self.settings.client_id);
        Ok(())
    }

    fn platform_is_open(&self) -> bool {
        self.shared.lock().is_ok_and(|s| s.connected)
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), SessionError> {
        let client = self.client.as_mut().ok_or(SessionError::LinkDown)?;
        client.subscribe(topic, to_esp_qos(qos)).map_err(|e| {
            warn!("MQTT: subscribe failed: {:?}", e);
            SessionError::SubscribeFailed
        })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, topic: &str, _qos: QoS) -> Result<(), SessionError> {
        self.sim_subscriptions.push(topic.to_string());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), PublishError> {
        let client = self.client.as_mut().ok_or(PublishError::NotConnected)?;
        client
            .enqueue(topic, to_esp_qos(qos), false, payload)
            .map_err(|e| {
                debug!("MQTT: enqueue failed: {:?}", e);
                PublishError::Rejected
            })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &[u8], _qos: QoS) -> Result<(), PublishError> {
        if self.sim_reject_publish {
            return Err(PublishError::Rejected);
        }
        debug!("MQTT(sim): publish '{}' ({} bytes)", topic, payload.len());
        self.sim_published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_close(&mut self) {
        // Dropping the client stops its task and closes the socket.
        self.client = None;
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_close(&mut self) {
        info!("MQTT(sim): closed");
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Deliver a message as if the broker had sent it.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_inject(&self, topic: &str, payload: &[u8]) -> bool {
        self.shared
            .lock()
            .is_ok_and(|mut s| s.connected && s.inbound.push(topic, payload))
    }

    /// Simulate the broker dropping the connection.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop(&self) {
        self.set_connected(false);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next_open(&mut self, error: SessionError) {
        self.sim_open_error = Some(error);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_reject_publish(&mut self, reject: bool) {
        self.sim_reject_publish = reject;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_opens(&self) -> u32 {
        self.sim_opens
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_subscriptions(&self) -> &[String] {
        &self.sim_subscriptions
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[(String, Vec<u8>)] {
        &self.sim_published
    }
}

#[cfg(target_os = "espidf")]
fn to_esp_qos(qos: QoS) -> embedded_svc::mqtt::client::QoS {
    match qos {
        QoS::AtMostOnce => embedded_svc::mqtt::client::QoS::AtMostOnce,
        QoS::AtLeastOnce => embedded_svc::mqtt::client::QoS::AtLeastOnce,
    }
}

// ───────────────────────────────────────────────────────────────
// BrokerPort
// ───────────────────────────────────────────────────────────────

impl BrokerPort for MqttAdapter {
    fn open(&mut self, credentials: &TlsCredentials) -> Result<(), SessionError> {
        self.close();
        if !credentials.is_complete() {
            return Err(SessionError::CredentialsMissing);
        }
        info!("MQTT: connecting to {}", self.settings.url);
        self.platform_open(credentials)
    }

    fn is_open(&self) -> bool {
        self.platform_is_open()
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), SessionError> {
        if !self.is_open() {
            return Err(SessionError::LinkDown);
        }
        self.platform_subscribe(topic, qos)
    }

    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), PublishError> {
        if !self.is_open() {
            return Err(PublishError::NotConnected);
        }
        self.platform_publish(topic, payload, qos)
    }

    fn poll(&mut self, deliver: &mut dyn FnMut(&str, &[u8])) {
        // Drain under the lock, deliver outside it.
        let mut batch: heapless::Vec<InboundMessage, INBOUND_CAPACITY> = heapless::Vec::new();
        if let Ok(mut s) = self.shared.lock() {
            while let Some(msg) = s.inbound.pop() {
                if batch.push(msg).is_err() {
                    break;
                }
            }
        }
        for msg in &batch {
            deliver(&msg.topic, &msg.payload);
        }
    }

    fn close(&mut self) {
        self.platform_close();
        self.set_connected(false);
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
