//! ESP32 time adapter.
//!
//! Implements [`ClockPort`] over the boot-relative monotonic timer.
//!
//! - **`target_os = "espidf"`** wraps `esp_timer_get_time()`, the same
//!   counter the pulse ISRs stamp edges with.
//! - **`not(target_os = "espidf")`** uses `std::time::Instant` for
//!   host-side simulation.
//!
//! Both readings are truncated to `u32`; the metering pipeline handles
//! the wrap (~71.6 min for µs, ~49.7 days for ms) with wrapping math.

use crate::app::ports::ClockPort;

pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot, full width.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: read-only access to the high-resolution timer.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since construction, full width.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl ClockPort for Esp32TimeAdapter {
    fn now_us(&self) -> u32 {
        self.uptime_us() as u32
    }

    fn now_ms(&self) -> u32 {
        (self.uptime_us() / 1_000) as u32
    }
}
