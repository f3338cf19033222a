//! Transport Supervisor — owns the link-layer association.
//!
//! `connect()` blocks until the link is up.  Transient failures are retried
//! forever with exponential backoff (2 s → 4 s → 8 s … capped at 60 s);
//! only configuration errors that no retry can fix are returned.
//!
//! While this runs nothing else in the loop does: no rendering, no
//! telemetry, no message routing.

use log::{error, info, warn};

use crate::error::LinkError;

use super::ports::{ClockPort, LinkPort};

// ───────────────────────────────────────────────────────────────
// Retry policy
// ───────────────────────────────────────────────────────────────

/// Exponential backoff between association attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_ms: u32,
    pub max_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_ms: 2_000,
            max_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based).  Attempt 0 never waits.
    pub fn delay_for(&self, attempt: u32) -> u32 {
        if attempt == 0 {
            return 0;
        }
        let shift = attempt.saturating_sub(1).min(31);
        self.initial_ms
            .saturating_mul(1u32 << shift)
            .min(self.max_ms)
    }
}

// ───────────────────────────────────────────────────────────────
// Supervisor
// ───────────────────────────────────────────────────────────────

pub struct TransportSupervisor<L: LinkPort> {
    link: L,
    policy: RetryPolicy,
    settle_delay_ms: u32,
}

impl<L: LinkPort> TransportSupervisor<L> {
    pub fn new(link: L, policy: RetryPolicy, settle_delay_ms: u32) -> Self {
        Self {
            link,
            policy,
            settle_delay_ms,
        }
    }

    /// Block until associated.  Returns the number of attempts made.
    ///
    /// Backoff waits go through [`ClockPort::sleep_ms`], so a simulated
    /// clock makes this deterministic in tests.
    pub fn connect(&mut self, clock: &mut impl ClockPort) -> Result<u32, LinkError> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match self.link.associate() {
                Ok(()) => {
                    info!("WiFi: associated after {} attempt(s)", attempt);
                    clock.sleep_ms(self.settle_delay_ms);
                    return Ok(attempt);
                }
                Err(e) if e.is_permanent() => {
                    error!("WiFi: {} (not retrying)", e);
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!("WiFi: attempt {} failed: {}; retry in {} ms", attempt, e, delay);
                    clock.sleep_ms(delay);
                }
            }
        }
    }

    /// Same as [`connect`](Self::connect), but returns `Ok(0)` without
    /// touching the link when it is already up.
    pub fn reconnect(&mut self, clock: &mut impl ClockPort) -> Result<u32, LinkError> {
        if self.is_connected() {
            return Ok(0);
        }
        warn!("WiFi: link down, reconnecting");
        self.connect(clock)
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_associated()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
