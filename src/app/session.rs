//! Session Manager — the secure publish/subscribe session.
//!
//! ```text
//!  Disconnected ──establish()──▶ Connecting ──handshake+subscribe──▶ Connected
//!       ▲                            │                                 │
//!       └──────── failure ───────────┘◀──── mark_stale() / link loss ──┘
//! ```
//!
//! Link loss is detected lazily: the loop notices on its next health check
//! and calls [`SessionManager::mark_stale`].  A session is only as good as
//! the link under it, and every new session re-registers the full
//! subscription set before telemetry resumes.

use log::{debug, info, warn};

use crate::error::{PublishError, SessionError};
use crate::topics::{TopicString, Topics};

use super::ports::{BrokerPort, ClockPort, LinkPort, QoS, TlsCredentials};
use super::transport::TransportSupervisor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct SessionManager<B: BrokerPort> {
    broker: B,
    credentials: TlsCredentials,
    state: SessionState,
    /// Topics registered on the current session.
    subscribed: heapless::Vec<TopicString, 3>,
    settle_delay_ms: u32,
}

impl<B: BrokerPort> SessionManager<B> {
    pub fn new(broker: B, credentials: TlsCredentials, settle_delay_ms: u32) -> Self {
        Self {
            broker,
            credentials,
            state: SessionState::Disconnected,
            subscribed: heapless::Vec::new(),
            settle_delay_ms,
        }
    }

    /// Handshake, then subscribe to every channel in `topics`.
    ///
    /// Fails without retrying; the caller decides when to try again.
    pub fn establish<L: LinkPort>(
        &mut self,
        transport: &TransportSupervisor<L>,
        topics: &Topics,
        clock: &mut impl ClockPort,
    ) -> Result<(), SessionError> {
        if !transport.is_connected() {
            return Err(SessionError::LinkDown);
        }
        if !self.credentials.is_complete() {
            return Err(SessionError::CredentialsMissing);
        }

        self.state = SessionState::Connecting;
        self.subscribed.clear();
        info!("MQTT: starting session");

        if let Err(e) = self.broker.open(&self.credentials) {
            warn!("MQTT: handshake failed: {}", e);
            self.state = SessionState::Disconnected;
            return Err(e);
        }

        for topic in topics.subscriptions() {
            if let Err(e) = self.broker.subscribe(topic, QoS::AtMostOnce) {
                warn!("MQTT: subscribe '{}' failed: {}", topic, e);
                self.broker.close();
                self.state = SessionState::Disconnected;
                self.subscribed.clear();
                return Err(e);
            }
            let mut owned = TopicString::new();
            owned
                .push_str(topic)
                .map_err(|_| SessionError::SubscribeFailed)?;
            self.subscribed
                .push(owned)
                .map_err(|_| SessionError::SubscribeFailed)?;
            debug!("MQTT: subscribed '{}'", topic);
        }

        self.state = SessionState::Connected;
        info!("MQTT: session up, {} subscriptions", self.subscribed.len());
        clock.sleep_ms(self.settle_delay_ms);
        Ok(())
    }

    /// Connected and the client still agrees.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected && self.broker.is_open()
    }

    /// The link under this session went away.  Drop it so the next
    /// recovery builds a fresh one.
    pub fn mark_stale(&mut self) {
        if self.state != SessionState::Disconnected {
            warn!("MQTT: session stale, dropping");
            self.broker.close();
            self.state = SessionState::Disconnected;
            self.subscribed.clear();
        }
    }

    /// Best-effort send on the current session.
    pub fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.broker.publish(topic, payload, qos)
    }

    /// Drain buffered inbound messages into `deliver`.  Does nothing
    /// without a session.
    pub fn poll_inbound(&mut self, deliver: &mut dyn FnMut(&str, &[u8])) {
        if self.state == SessionState::Connected {
            self.broker.poll(deliver);
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn subscriptions(&self) -> &[TopicString] {
        &self.subscribed
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }
}
