//! Status screen adapter.
//!
//! Implements [`DisplayPort`].  Screen layout is out of scope for this
//! firmware; the adapter records what was drawn and logs it, which is
//! what a board without a panel (or the simulator) shows.

use log::info;

use crate::app::ports::DisplayPort;
use crate::app::state::AlarmState;

pub struct StatusDisplay {
    badge_label: heapless::String<24>,
    shown: Option<AlarmState>,
    renders: u32,
}

impl StatusDisplay {
    pub fn new(badge_label: heapless::String<24>) -> Self {
        Self {
            badge_label,
            shown: None,
            renders: 0,
        }
    }

    /// What is on screen right now.
    pub fn shown(&self) -> Option<AlarmState> {
        self.shown
    }

    /// Full redraws since boot.
    pub fn renders(&self) -> u32 {
        self.renders
    }

    fn draw(&mut self, state: AlarmState) {
        self.shown = Some(state);
        self.renders = self.renders.wrapping_add(1);
        match state {
            AlarmState::Safe => info!("Display: [{}] Safe", self.badge_label),
            AlarmState::Alarm => info!("Display: [{}] Warning!", self.badge_label),
        }
    }
}

impl DisplayPort for StatusDisplay {
    fn render_safe(&mut self) {
        self.draw(AlarmState::Safe);
    }

    fn render_alarm(&mut self) {
        self.draw(AlarmState::Alarm);
    }
}
