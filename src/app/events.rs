//! Outbound application events.
//!
//! The [`BadgeService`](super::service::BadgeService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::error::{DecodeError, SessionError};
use crate::topics::Channel;

use super::state::AlarmState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Bring-up finished; the steady loop is about to start.
    Started { session_up: bool },

    /// The router changed the alarm state.
    AlarmChanged {
        from: AlarmState,
        to: AlarmState,
        via: Channel,
    },

    /// An inbound message was dropped.
    MessageDropped { channel: Channel, reason: DecodeError },

    /// The link came back after `attempts` association attempts.
    LinkRestored { attempts: u32 },

    /// Handshake and subscribe-all completed.
    SessionEstablished,

    /// Handshake or subscription failed; retried next iteration.
    SessionFailed(SessionError),

    /// A telemetry cycle ran.
    TelemetrySent(super::telemetry::PublishReport),

    /// Uptime reached the restart threshold.
    RestartScheduled { uptime_secs: u64 },
}
