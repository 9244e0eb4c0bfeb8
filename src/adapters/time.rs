//! Monotonic clock adapter.
//!
//! Implements [`Clock`] for the main loop and provides [`uptime_ms`] for the
//! network adapters, which timestamp requests on their own tasks.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` (microsecond,
//!   monotonic) and delays through FreeRTOS so other tasks keep running.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` since first use.

use crate::app::ports::Clock;

/// Milliseconds since boot (monotonic).
#[cfg(target_os = "espidf")]
pub fn uptime_ms() -> u64 {
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
}

/// Milliseconds since the first call in this process (monotonic).
#[cfg(not(target_os = "espidf"))]
pub fn uptime_ms() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u64
}

/// Real-time [`Clock`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        uptime_ms()
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
