//! Linear calibration from pulse frequency to physical units.

use super::MeteringSnapshot;

/// Default `CF` scale (W per Hz).  Board-specific; tune after bench test.
pub const DEFAULT_POWER_W_PER_HZ: f32 = 1.2;
/// Default `CF1` scale (A per Hz).
pub const DEFAULT_CURRENT_A_PER_HZ: f32 = 0.003;

/// Frequency-to-unit scale factors for both pulse lines.
///
/// Factors are positive and fixed at construction; `PlugConfig::validate`
/// rejects anything else before a `Calibration` is ever built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// `CF` Hz → watts.
    pub power_w_per_hz: f32,
    /// `CF1` Hz → amps.
    pub current_a_per_hz: f32,
}

impl Calibration {
    pub const fn new(power_w_per_hz: f32, current_a_per_hz: f32) -> Self {
        Self {
            power_w_per_hz,
            current_a_per_hz,
        }
    }

    pub fn watts(&self, power_hz: f32) -> f32 {
        power_hz * self.power_w_per_hz
    }

    pub fn amps(&self, current_hz: f32) -> f32 {
        current_hz * self.current_a_per_hz
    }

    /// Scale a pair of channel frequencies into a reading.
    pub fn convert(&self, power_hz: f32, current_hz: f32) -> MeteringSnapshot {
        MeteringSnapshot {
            amps: self.amps(current_hz),
            watts: self.watts(power_hz),
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(DEFAULT_POWER_W_PER_HZ, DEFAULT_CURRENT_A_PER_HZ)
    }
}
