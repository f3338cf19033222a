//! System clock adapter.
//!
//! Implements [`ClockPort`] for the badge.
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`
//!   (microsecond precision), wall clock from `gettimeofday()`, NTP via
//!   `EspSntp`.  The loop sleeps through the FreeRTOS scheduler, which
//!   lets the WiFi and BLE tasks run.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and
//!   `SystemTime` for host-side simulation.

use log::info;

use crate::app::ports::ClockPort;

/// Anything before 2020-01-01 means the wall clock has not been set.
const EPOCH_2020: i64 = 1_577_836_800;

/// Time between NTP sync checks.
const SYNC_RETRY_MS: u32 = 1000;

pub struct SystemClock {
    #[cfg(target_os = "espidf")]
    sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    synced: bool,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            sntp: None,
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            synced: false,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_monotonic_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_monotonic_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    #[cfg(target_os = "espidf")]
    fn platform_wall_secs(&self) -> i64 {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_wall_secs(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }

    /// One sync check.  Starts the SNTP service on first use.
    #[cfg(target_os = "espidf")]
    fn platform_try_sync(&mut self) -> bool {
        use esp_idf_svc::sntp::{EspSntp, SyncStatus};

        if self.sntp.is_none() {
            match EspSntp::new_default() {
                Ok(sntp) => {
                    info!("Time: SNTP started");
                    self.sntp = Some(sntp);
                }
                Err(e) => {
                    log::warn!("Time: SNTP start failed: {:?}", e);
                    return false;
                }
            }
        }
        let completed = self
            .sntp
            .as_ref()
            .is_some_and(|s| s.get_sync_status() == SyncStatus::Completed);
        completed && self.platform_wall_secs() >= EPOCH_2020
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_try_sync(&mut self) -> bool {
        self.platform_wall_secs() >= EPOCH_2020
    }
}

// ───────────────────────────────────────────────────────────────
// ClockPort
// ───────────────────────────────────────────────────────────────

impl ClockPort for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        self.platform_monotonic_us() / 1000
    }

    fn wall_clock_secs(&self) -> i64 {
        self.platform_wall_secs()
    }

    fn sync_wall_clock(&mut self) {
        if self.synced {
            return;
        }
        while !self.platform_try_sync() {
            log::warn!("Time: NTP not synced yet, retrying");
            self.sleep_ms(SYNC_RETRY_MS);
        }
        self.synced = true;
        info!("Time: wall clock synced ({})", self.platform_wall_secs());
    }

    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
