//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BadgeService (domain)
//! ```
//!
//! Driven adapters (WiFi, MQTT client, display, clock) implement these
//! traits.  The [`BadgeService`](super::service::BadgeService) consumes
//! them via generics, so the domain core never touches a driver directly.

use crate::error::{LinkError, PublishError, SessionError};

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: WiFi station)
// ───────────────────────────────────────────────────────────────

/// One association attempt plus a non-blocking health check.
///
/// Retrying is the [`TransportSupervisor`](super::transport::TransportSupervisor)'s
/// job; implementations make a single attempt and report the outcome.
pub trait LinkPort {
    /// Attempt to associate with the configured access point.
    /// Blocks for at most one attempt.
    fn associate(&mut self) -> Result<(), LinkError>;

    /// Whether the station is currently associated with an IP address.
    fn is_associated(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Broker port (driven adapter: secure MQTT client)
// ───────────────────────────────────────────────────────────────

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    /// At most once: no acknowledgement, no retry.
    AtMostOnce,
    /// At least once: acknowledged, may be redelivered.
    AtLeastOnce,
}

/// PEM client certificate and private key, NUL-terminated for mbedTLS.
#[derive(Clone)]
pub struct TlsCredentials {
    pub certificate: heapless::Vec<u8, MAX_CERT_SIZE>,
    pub private_key: heapless::Vec<u8, MAX_KEY_SIZE>,
}

/// Maximum certificate size (PEM format, includes headers and NUL).
pub const MAX_CERT_SIZE: usize = 4096;

/// Maximum private key size (PEM format, includes headers and NUL).
pub const MAX_KEY_SIZE: usize = 4096;

impl TlsCredentials {
    pub fn is_complete(&self) -> bool {
        !self.certificate.is_empty() && !self.private_key.is_empty()
    }
}

impl core::fmt::Debug for TlsCredentials {
    // Never print key material.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TlsCredentials")
            .field("certificate", &self.certificate.len())
            .field("private_key", &self.private_key.len())
            .finish()
    }
}

/// Secure publish/subscribe client.
///
/// Endpoint, client id and keepalive are adapter configuration; the
/// credential material is handed over on every handshake.
pub trait BrokerPort {
    /// Perform the TLS + MQTT handshake.  Any previous connection is dropped.
    fn open(&mut self, credentials: &TlsCredentials) -> Result<(), SessionError>;

    /// Whether the client still considers the connection up.
    fn is_open(&self) -> bool;

    /// Register interest in a topic on the current connection.
    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), SessionError>;

    /// Send one message.
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), PublishError>;

    /// Hand every buffered inbound message to `deliver`, oldest first.
    /// Never blocks.
    fn poll(&mut self, deliver: &mut dyn FnMut(&str, &[u8]));

    /// Tear the connection down.
    fn close(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Display port (driven adapter: screen)
// ───────────────────────────────────────────────────────────────

/// Two-state status screen.  No return contract.
pub trait DisplayPort {
    fn render_safe(&mut self);
    fn render_alarm(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: timers, wall clock, scheduler yield)
// ───────────────────────────────────────────────────────────────

/// Monotonic time, wall-clock time, and the loop's only yield point.
pub trait ClockPort {
    /// Milliseconds since boot (monotonic).
    fn monotonic_ms(&self) -> u64;

    /// Seconds since the Unix epoch, as set by the last wall-clock sync.
    fn wall_clock_secs(&self) -> i64;

    /// Block until the wall clock is synchronised.  Idempotent.
    fn sync_wall_clock(&mut self);

    /// Suspend the loop, yielding to background tasks.
    fn sleep_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}
