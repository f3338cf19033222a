//! Telemetry Publisher.
//!
//! Once per `T_pub` it drains inbound messages, asks the shadow for the
//! desired state, and publishes the badge status plus a reported-state
//! mirror.  Every publish is best-effort: failures end up in the
//! [`PublishReport`] and are discarded by the caller.

use log::{debug, warn};
use serde::Serialize;

use crate::config::{BadgeConfig, NameString};
use crate::error::{ConfigError, PublishError};

use super::events::AppEvent;
use super::messages::{ShadowUpdate, StatusReport};
use super::ports::{BrokerPort, ClockPort, EventSink, QoS};
use super::router::MessageRouter;
use super::session::SessionManager;
use super::state::{AlarmState, StateStore};

/// Largest outbound JSON document.
pub const MAX_OUTBOUND_LEN: usize = 256;

/// Outcome of one telemetry cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub shadow_get: Result<(), PublishError>,
    pub status: Result<(), PublishError>,
    pub shadow_update: Result<(), PublishError>,
    pub alarm_state: AlarmState,
    pub uptime_secs: u64,
}

impl PublishReport {
    pub fn all_sent(&self) -> bool {
        self.failures() == 0
    }

    pub fn failures(&self) -> usize {
        [&self.shadow_get, &self.status, &self.shadow_update]
            .iter()
            .filter(|r| r.is_err())
            .count()
    }
}

pub struct TelemetryPublisher {
    interval_ms: u64,
    started_ms: u64,
    last_publish_ms: u64,
    time_offset_secs: i64,
    device_id: NameString,
}

impl TelemetryPublisher {
    pub fn new(config: &BadgeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            interval_ms: u64::from(config.publish_interval_ms),
            started_ms: 0,
            last_publish_ms: 0,
            time_offset_secs: config.time_offset_secs,
            device_id: config.thing_name()?,
        })
    }

    /// Anchor uptime and the publish timer at `now_ms`.
    pub fn start(&mut self, now_ms: u64) {
        self.started_ms = now_ms;
        self.last_publish_ms = now_ms;
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_publish_ms) >= self.interval_ms
    }

    pub fn uptime_secs(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_ms) / 1000
    }

    pub fn last_publish_ms(&self) -> u64 {
        self.last_publish_ms
    }

    /// Run one cycle if `T_pub` has elapsed since the last one.
    pub fn tick<B: BrokerPort>(
        &mut self,
        now_ms: u64,
        session: &mut SessionManager<B>,
        router: &MessageRouter,
        store: &mut StateStore,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Option<PublishReport> {
        if !self.is_due(now_ms) {
            return None;
        }

        session.poll_inbound(&mut |topic, payload| {
            router.on_message(topic, payload, &mut *store, &mut *sink);
        });

        let topics = router.topics();
        let alarm_state = store.get();
        let uptime_secs = self.uptime_secs(now_ms);

        let shadow_get = session.publish(&topics.shadow_get, b"", QoS::AtMostOnce);

        let status = encode(&StatusReport {
            device_id: self.device_id.as_str(),
            time_seconds: clock.wall_clock_secs().saturating_add(self.time_offset_secs),
            uptime: uptime_secs,
            alarm_state,
        })
        .and_then(|body| session.publish(&topics.device_up, &body, QoS::AtMostOnce));

        let shadow_update = encode(&ShadowUpdate::reported(alarm_state))
            .and_then(|body| session.publish(&topics.shadow_update, &body, QoS::AtMostOnce));

        self.last_publish_ms = now_ms;

        let report = PublishReport {
            shadow_get,
            status,
            shadow_update,
            alarm_state,
            uptime_secs,
        };
        if report.all_sent() {
            debug!("Telemetry: sent {} uptime={}s", alarm_state, uptime_secs);
        } else {
            warn!("Telemetry: {} of 3 publishes dropped", report.failures());
        }
        sink.emit(&AppEvent::TelemetrySent(report.clone()));
        Some(report)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, PublishError> {
    let body = serde_json::to_vec(value).map_err(|_| PublishError::Rejected)?;
    if body.len() > MAX_OUTBOUND_LEN {
        return Err(PublishError::PayloadTooLarge);
    }
    Ok(body)
}
