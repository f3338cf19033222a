//! Application service — the supervisory loop.
//!
//! [`BadgeService`] owns the transport, the session, the state store and
//! both timers.  It exposes a hardware-agnostic API; the link and broker
//! adapters are handed over at construction, while display, clock and
//! event sink are injected at call sites so tests can drive the whole
//! loop with mocks and a simulated clock.
//!
//! ```text
//!   LinkPort ──▶ ┌──────────────────────────────┐ ──▶ DisplayPort
//!                │          BadgeService        │
//! BrokerPort ◀──▶│ Transport · Session · Router │ ──▶ EventSink
//!                │  Telemetry · StateStore      │
//!                └──────────────────────────────┘
//! ```
//!
//! Phases: `Init → Running → Restart`.  `Restart` is terminal; the caller
//! reboots the device when [`BadgeService::tick`] returns
//! [`LoopStep::Restart`].

use log::{error, info, warn};

use crate::config::BadgeConfig;
use crate::error::{ConfigError, LinkError};
use crate::topics::Topics;

use super::events::AppEvent;
use super::ports::{BrokerPort, ClockPort, DisplayPort, EventSink, LinkPort, TlsCredentials};
use super::router::MessageRouter;
use super::session::SessionManager;
use super::state::{AlarmState, StateStore};
use super::telemetry::TelemetryPublisher;
use super::transport::{RetryPolicy, TransportSupervisor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Init,
    Running,
    Restart,
}

/// What the caller should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStep {
    Continue,
    /// Uptime reached `T_reset`; reboot now.
    Restart,
}

// ───────────────────────────────────────────────────────────────
// BadgeService
// ───────────────────────────────────────────────────────────────

pub struct BadgeService<L: LinkPort, B: BrokerPort> {
    phase: LoopPhase,
    transport: TransportSupervisor<L>,
    session: SessionManager<B>,
    router: MessageRouter,
    telemetry: TelemetryPublisher,
    store: StateStore,
    loop_interval_ms: u32,
    reset_after_ms: Option<u64>,
    started_ms: u64,
    tick_count: u64,
}

impl<L: LinkPort, B: BrokerPort> BadgeService<L, B> {
    /// Build the service from configuration.
    ///
    /// Does **not** touch the network; call [`start`](Self::start) next.
    pub fn new(
        config: &BadgeConfig,
        link: L,
        broker: B,
        credentials: TlsCredentials,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let topics = Topics::new(config)?;

        Ok(Self {
            phase: LoopPhase::Init,
            transport: TransportSupervisor::new(link, RetryPolicy::default(), config.settle_delay_ms),
            session: SessionManager::new(broker, credentials, config.settle_delay_ms),
            router: MessageRouter::new(topics),
            telemetry: TelemetryPublisher::new(config)?,
            store: StateStore::new(),
            loop_interval_ms: config.loop_interval_ms,
            reset_after_ms: config.reset_after_secs.map(|s| u64::from(s) * 1000),
            started_ms: 0,
            tick_count: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring-up: link → wall clock → session.  Blocks until the link is up.
    ///
    /// A failed session handshake is not an error here; the first tick
    /// retries it.  Only a link configuration error is returned.
    pub fn start(
        &mut self,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<(), LinkError> {
        if self.phase != LoopPhase::Init {
            warn!("Loop: start() called in {:?}, ignoring", self.phase);
            return Ok(());
        }

        self.transport.connect(clock)?;
        clock.sync_wall_clock();
        let session_up = self.bring_up_session(clock, sink);

        let now = clock.monotonic_ms();
        self.started_ms = now;
        self.telemetry.start(now);
        self.phase = LoopPhase::Running;

        sink.emit(&AppEvent::Started { session_up });
        info!("Loop: running (session {})", if session_up { "up" } else { "down" });
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One loop iteration: recover → render → telemetry → sleep → restart check.
    pub fn tick(
        &mut self,
        display: &mut impl DisplayPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> LoopStep {
        match self.phase {
            LoopPhase::Restart => return LoopStep::Restart,
            LoopPhase::Init => {
                warn!("Loop: tick() before start()");
                return LoopStep::Continue;
            }
            LoopPhase::Running => {}
        }
        self.tick_count += 1;

        // 1. Connectivity health check (blocking recovery)
        let session_ready = self.ensure_connected(clock, sink);

        // 2. Render only on change
        if let Some(state) = self.store.take_pending_render() {
            match state {
                AlarmState::Safe => display.render_safe(),
                AlarmState::Alarm => display.render_alarm(),
            }
            info!("Loop: display shows {}", state);
        }

        // 3. Telemetry, gated by its own timer
        if session_ready {
            let now = clock.monotonic_ms();
            self.telemetry.tick(
                now,
                &mut self.session,
                &self.router,
                &mut self.store,
                &*clock,
                sink,
            );
        }

        // 4. Yield
        clock.sleep_ms(self.loop_interval_ms);

        // 5. Scheduled restart
        if let Some(limit) = self.reset_after_ms {
            let uptime_ms = clock.monotonic_ms().saturating_sub(self.started_ms);
            if uptime_ms >= limit {
                let uptime_secs = uptime_ms / 1000;
                info!("Loop: uptime {}s reached restart threshold", uptime_secs);
                self.phase = LoopPhase::Restart;
                sink.emit(&AppEvent::RestartScheduled { uptime_secs });
                return LoopStep::Restart;
            }
        }

        LoopStep::Continue
    }

    /// Tick until the restart threshold.  Never returns when the
    /// scheduled restart is disabled.
    pub fn run_until_restart(
        &mut self,
        display: &mut impl DisplayPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        while self.tick(display, clock, sink) == LoopStep::Continue {}
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.store.get()
    }

    pub fn rendered_state(&self) -> Option<AlarmState> {
        self.store.rendered()
    }

    /// Loop iterations executed while running.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn topics(&self) -> &Topics {
        self.router.topics()
    }

    pub fn transport(&self) -> &TransportSupervisor<L> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut TransportSupervisor<L> {
        &mut self.transport
    }

    pub fn session(&self) -> &SessionManager<B> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<B> {
        &mut self.session
    }

    // ── Internal ──────────────────────────────────────────────

    /// Returns whether a usable session exists after any recovery.
    fn ensure_connected(&mut self, clock: &mut impl ClockPort, sink: &mut impl EventSink) -> bool {
        let link_up = self.transport.is_connected();
        if link_up && self.session.is_connected() {
            return true;
        }

        self.session.mark_stale();
        if !link_up {
            match self.transport.reconnect(clock) {
                Ok(attempts) => sink.emit(&AppEvent::LinkRestored { attempts }),
                Err(e) => {
                    error!("Loop: link cannot recover: {}", e);
                    return false;
                }
            }
        }
        self.bring_up_session(clock, sink)
    }

    fn bring_up_session(&mut self, clock: &mut impl ClockPort, sink: &mut impl EventSink) -> bool {
        match self.session.establish(&self.transport, self.router.topics(), clock) {
            Ok(()) => {
                sink.emit(&AppEvent::SessionEstablished);
                true
            }
            Err(e) => {
                warn!("Loop: session not established: {}", e);
                sink.emit(&AppEvent::SessionFailed(e));
                false
            }
        }
    }
}
