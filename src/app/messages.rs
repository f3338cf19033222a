//! JSON payload schemas.
//!
//! Inbound:
//!
//! - command: `{"command": "enter_alarm" | "exit_alarm"}`
//! - shadow get/accepted: `{"state": {"desired": {"alarm_state": 0|1}}}`
//!
//! Outbound:
//!
//! - status: `{"device_id", "time_seconds", "uptime", "alarm_state"}`
//! - shadow update: `{"state": {"reported": {"alarm_state": 0|1}}}`

use serde::{Deserialize, Serialize};

use super::state::AlarmState;

// ── Inbound ───────────────────────────────────────────────────

/// Command sent on the device or broadcast downlink.
#[derive(Debug, Deserialize)]
pub struct CommandMessage {
    pub command: String,
}

/// Recognised command words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    EnterAlarm,
    ExitAlarm,
}

impl Command {
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "enter_alarm" => Some(Self::EnterAlarm),
            "exit_alarm" => Some(Self::ExitAlarm),
            _ => None,
        }
    }

    pub fn target(self) -> AlarmState {
        match self {
            Self::EnterAlarm => AlarmState::Alarm,
            Self::ExitAlarm => AlarmState::Safe,
        }
    }
}

/// Shadow document returned on `get/accepted`.  The broker omits `desired`
/// until something has been written there.
#[derive(Debug, Deserialize)]
pub struct ShadowAccepted {
    pub state: ShadowState,
}

#[derive(Debug, Deserialize)]
pub struct ShadowState {
    #[serde(default)]
    pub desired: Option<DesiredState>,
}

/// Kept numeric so an out-of-range value can be reported as such.
#[derive(Debug, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub alarm_state: Option<u8>,
}

// ── Outbound ──────────────────────────────────────────────────

/// Periodic status report on the device uplink.
#[derive(Debug, Serialize)]
pub struct StatusReport<'a> {
    pub device_id: &'a str,
    pub time_seconds: i64,
    pub uptime: u64,
    pub alarm_state: AlarmState,
}

/// Reported-state mirror sent to the shadow.
#[derive(Debug, Serialize)]
pub struct ShadowUpdate {
    pub state: ReportedState,
}

#[derive(Debug, Serialize)]
pub struct ReportedState {
    pub reported: ReportedAlarm,
}

#[derive(Debug, Serialize)]
pub struct ReportedAlarm {
    pub alarm_state: AlarmState,
}

impl ShadowUpdate {
    pub fn reported(alarm_state: AlarmState) -> Self {
        Self {
            state: ReportedState {
                reported: ReportedAlarm { alarm_state },
            },
        }
    }
}
