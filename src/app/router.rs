//! Inbound message router.
//!
//! Decodes messages from the three subscribed channels and applies the
//! resulting alarm state to the [`StateStore`].  Every applied message
//! overwrites the state unconditionally: whichever message is processed
//! last wins, across all channels.
//!
//! ```text
//!  device down ──┐
//!  broadcast   ──┼──▶ decode ──▶ StateStore::set
//!  get/accepted──┘
//! ```

use log::{debug, info, warn};

use crate::error::DecodeError;
use crate::topics::{Channel, Topics};

use super::events::AppEvent;
use super::messages::{Command, CommandMessage, ShadowAccepted};
use super::ports::EventSink;
use super::state::{AlarmState, StateStore};

/// What the router did with a well-formed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The alarm state was overwritten with this value.
    Applied(AlarmState),
    /// Nothing to apply (unknown topic, unknown command, no desired state).
    Ignored,
}

pub struct MessageRouter {
    topics: Topics,
}

impl MessageRouter {
    pub fn new(topics: Topics) -> Self {
        Self { topics }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Decode and apply one message.
    pub fn route(
        &self,
        topic: &str,
        payload: &[u8],
        store: &mut StateStore,
    ) -> Result<RouteOutcome, DecodeError> {
        let target = match self.topics.classify(topic) {
            Channel::DeviceCommand | Channel::BroadcastCommand => decode_command(payload)?,
            Channel::ShadowGetAccepted => decode_desired(payload)?,
            Channel::Unknown => {
                debug!("Router: ignoring message on unsubscribed topic '{}'", topic);
                None
            }
        };

        Ok(match target {
            Some(state) => {
                store.set(state);
                RouteOutcome::Applied(state)
            }
            None => RouteOutcome::Ignored,
        })
    }

    /// Entry point for the session's poll step.  Decode failures are logged,
    /// reported as [`AppEvent::MessageDropped`], and never propagated.
    pub fn on_message(
        &self,
        topic: &str,
        payload: &[u8],
        store: &mut StateStore,
        sink: &mut impl EventSink,
    ) -> Option<AlarmState> {
        let channel = self.topics.classify(topic);
        let before = store.get();
        match self.route(topic, payload, store) {
            Ok(RouteOutcome::Applied(after)) => {
                if after != before {
                    info!("Router: {} -> {} via {:?}", before, after, channel);
                    sink.emit(&AppEvent::AlarmChanged {
                        from: before,
                        to: after,
                        via: channel,
                    });
                }
                Some(after)
            }
            Ok(RouteOutcome::Ignored) => None,
            Err(reason) => {
                warn!("Router: dropped message on '{}': {}", topic, reason);
                sink.emit(&AppEvent::MessageDropped { channel, reason });
                None
            }
        }
    }
}

fn decode_command(payload: &[u8]) -> Result<Option<AlarmState>, DecodeError> {
    let msg: CommandMessage = serde_json::from_slice(payload)?;
    match Command::parse(&msg.command) {
        Some(cmd) => Ok(Some(cmd.target())),
        None => {
            debug!("Router: unrecognised command '{}'", msg.command);
            Ok(None)
        }
    }
}

fn decode_desired(payload: &[u8]) -> Result<Option<AlarmState>, DecodeError> {
    let doc: ShadowAccepted = serde_json::from_slice(payload)?;
    match doc.state.desired.and_then(|d| d.alarm_state) {
        Some(raw) => AlarmState::try_from(raw).map(Some),
        None => Ok(None),
    }
}
