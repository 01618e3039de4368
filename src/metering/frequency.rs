//! Period → frequency conversion with a staleness timeout.
//!
//! When the load is switched off the metering chip simply stops pulsing,
//! so the last captured period would otherwise be reported forever.  Any
//! snapshot whose last edge is older than the timeout reads as 0 Hz.

use super::pulse::PulseSnapshot;

/// Default staleness window: 2 s without an edge means "no signal".
pub const DEFAULT_STALE_TIMEOUT_US: u32 = 2_000_000;

const MICROS_PER_SEC: f32 = 1_000_000.0;

/// Converts pulse snapshots into frequency estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyEstimator {
    stale_timeout_us: u32,
}

impl FrequencyEstimator {
    pub const fn new(stale_timeout_us: u32) -> Self {
        Self { stale_timeout_us }
    }

    pub fn stale_timeout_us(&self) -> u32 {
        self.stale_timeout_us
    }

    /// Estimate the pulse frequency (Hz) at `now_us`.
    ///
    /// Returns `0.0` when no period has been measured yet or when the last
    /// edge is older than the staleness timeout.  Ages are computed with
    /// wrapping subtraction so a u32 timer rollover is harmless.
    pub fn estimate(&self, snap: PulseSnapshot, now_us: u32) -> f32 {
        if snap.last_period_us == 0 {
            return 0.0;
        }

        let age_us = now_us.wrapping_sub(snap.last_edge_us);
        if age_us > self.stale_timeout_us {
            return 0.0;
        }

        period_to_hz(snap.last_period_us)
    }
}

impl Default for FrequencyEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIMEOUT_US)
    }
}

/// `1_000_000 / period_us`, or `0.0` for a zero period.
pub fn period_to_hz(period_us: u32) -> f32 {
    if period_us == 0 {
        0.0
    } else {
        MICROS_PER_SEC / period_us as f32
    }
}
