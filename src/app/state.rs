//! Alarm state and its single owner.
//!
//! [`StateStore`] holds the live [`AlarmState`] (written by the router) and
//! the value last shown on screen (written by the renderer).  Both live in
//! the loop's thread only, so there is no locking.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Binary safety status.  Encoded on the wire as `0` (SAFE) or `1` (ALARM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum AlarmState {
    #[default]
    Safe = 0,
    Alarm = 1,
}

impl From<AlarmState> for u8 {
    fn from(state: AlarmState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for AlarmState {
    type Error = DecodeError;

    fn try_from(raw: u8) -> Result<Self, DecodeError> {
        match raw {
            0 => Ok(Self::Safe),
            1 => Ok(Self::Alarm),
            _ => Err(DecodeError::InvalidAlarmState),
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "SAFE"),
            Self::Alarm => write!(f, "ALARM"),
        }
    }
}

/// The live alarm state plus what the display currently shows.
#[derive(Debug, Default)]
pub struct StateStore {
    current: AlarmState,
    /// `None` until the first render.
    rendered: Option<AlarmState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> AlarmState {
        self.current
    }

    /// Overwrite the alarm state.  Returns the previous value.
    pub fn set(&mut self, state: AlarmState) -> AlarmState {
        core::mem::replace(&mut self.current, state)
    }

    pub fn rendered(&self) -> Option<AlarmState> {
        self.rendered
    }

    /// The state to draw, if it differs from what is on screen.
    /// Marks it as rendered.
    pub fn take_pending_render(&mut self) -> Option<AlarmState> {
        if self.rendered == Some(self.current) {
            return None;
        }
        self.rendered = Some(self.current);
        Some(self.current)
    }
}
