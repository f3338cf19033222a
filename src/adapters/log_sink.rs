//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { session_up } => {
                info!("START | session={}", if *session_up { "up" } else { "down" });
            }
            AppEvent::AlarmChanged { from, to, via } => {
                info!("ALARM | {} -> {} | via={:?}", from, to, via);
            }
            AppEvent::MessageDropped { channel, reason } => {
                warn!("DROP  | channel={:?} | {}", channel, reason);
            }
            AppEvent::LinkRestored { attempts } => {
                info!("LINK  | restored after {} attempt(s)", attempts);
            }
            AppEvent::SessionEstablished => {
                info!("MQTT  | session established");
            }
            AppEvent::SessionFailed(e) => {
                warn!("MQTT  | session failed: {}", e);
            }
            AppEvent::TelemetrySent(r) => {
                info!(
                    "TELEM | alarm={} | uptime={}s | sent={}/3",
                    r.alarm_state,
                    r.uptime_secs,
                    3 - r.failures(),
                );
            }
            AppEvent::RestartScheduled { uptime_secs } => {
                warn!("RESET | scheduled restart at uptime={}s", uptime_secs);
            }
        }
    }
}
