//! Device restart adapter.

use log::warn;

/// Reboot the device.  Nothing is flushed or closed first: all state is
/// volatile and the broker notices the dropped session on its own.
#[cfg(target_os = "espidf")]
pub fn restart() -> ! {
    warn!("System: restarting");
    // Give the UART a moment to drain the last log line.
    std::thread::sleep(std::time::Duration::from_millis(100));
    unsafe { esp_idf_sys::esp_restart() };
    #[allow(clippy::empty_loop)]
    loop {}
}

/// In simulation a restart ends the process.
#[cfg(not(target_os = "espidf"))]
pub fn restart() -> ! {
    warn!("System(sim): restart requested, exiting");
    std::process::exit(0)
}
