//! Reading sources — where a tick's `(amps, watts)` comes from.
//!
//! | Source            | Used when                  | Produces                          |
//! |-------------------|----------------------------|-----------------------------------|
//! | [`PulseSource`]     | `SampleMode::Live`         | calibrated HLW8012 pulse readings |
//! | [`SimulatedSource`] | `SampleMode::Simulated`    | bounded random load, no hardware  |
//!
//! The [`Meter`](super::Meter) only sees the [`ReadingSource`] trait, so
//! the rest of the pipeline has no mode branches.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::MeteringSnapshot;
use super::calibration::Calibration;
use super::frequency::FrequencyEstimator;
use super::pulse::PulseChannel;
use crate::config::SampleMode;

/// Anything that can produce an instantaneous reading.
pub trait ReadingSource {
    /// Produce the reading for `now_us` (monotonic µs, wrapping).
    fn sample(&mut self, now_us: u32) -> MeteringSnapshot;
}

// ── Live pulse source ─────────────────────────────────────────

/// Calibrated readings from the two HLW8012 pulse channels.
pub struct PulseSource<'a> {
    power: &'a PulseChannel,
    current: &'a PulseChannel,
    estimator: FrequencyEstimator,
    calibration: Calibration,
}

impl<'a> PulseSource<'a> {
    pub fn new(
        power: &'a PulseChannel,
        current: &'a PulseChannel,
        estimator: FrequencyEstimator,
        calibration: Calibration,
    ) -> Self {
        Self {
            power,
            current,
            estimator,
            calibration,
        }
    }

    /// Latest `(power_hz, current_hz)` estimates.
    pub fn frequencies(&self, now_us: u32) -> (f32, f32) {
        let power_hz = self.estimator.estimate(self.power.snapshot(), now_us);
        let current_hz = self.estimator.estimate(self.current.snapshot(), now_us);
        (power_hz, current_hz)
    }
}

impl ReadingSource for PulseSource<'_> {
    fn sample(&mut self, now_us: u32) -> MeteringSnapshot {
        let (power_hz, current_hz) = self.frequencies(now_us);
        self.calibration.convert(power_hz, current_hz)
    }
}

// ── Simulated source ──────────────────────────────────────────

/// Synthetic readings for bench testing without a metering chip attached.
///
/// Watts are drawn uniformly from `[min_watts, max_watts]`; amps follow
/// from the nominal line voltage.
pub struct SimulatedSource {
    rng: SmallRng,
    min_watts: f32,
    max_watts: f32,
    line_voltage: f32,
}

/// Upper clamp for simulated load (W); well above any plug rating.
pub const SIMULATED_WATTS_CEILING: f32 = 10_000.0;

fn clamp_watts(w: f32) -> f32 {
    if w.is_nan() {
        0.0
    } else {
        w.clamp(0.0, SIMULATED_WATTS_CEILING)
    }
}

impl SimulatedSource {
    /// Bounds are clamped to `[0, SIMULATED_WATTS_CEILING]` (NaN reads as 0)
    /// and swapped if inverted, so [`sample`](ReadingSource::sample) never
    /// sees an unusable range.
    pub fn new(seed: u64, min_watts: f32, max_watts: f32, line_voltage: f32) -> Self {
        let (min_watts, max_watts) = (clamp_watts(min_watts), clamp_watts(max_watts));
        let (min_watts, max_watts) = if min_watts <= max_watts {
            (min_watts, max_watts)
        } else {
            (max_watts, min_watts)
        };
        Self {
            rng: SmallRng::seed_from_u64(seed),
            min_watts,
            max_watts,
            line_voltage,
        }
    }
}

impl ReadingSource for SimulatedSource {
    fn sample(&mut self, _now_us: u32) -> MeteringSnapshot {
        let watts = self.rng.gen_range(self.min_watts..=self.max_watts);
        let amps = if self.line_voltage > 0.0 {
            watts / self.line_voltage
        } else {
            0.0
        };
        MeteringSnapshot { amps, watts }
    }
}

// ── Mode-selected source ──────────────────────────────────────

/// Either source, picked once from [`SampleMode`] at start-up.
pub enum MeterSource<'a> {
    Live(PulseSource<'a>),
    Simulated(SimulatedSource),
}

impl<'a> MeterSource<'a> {
    /// Build the source matching `mode`.
    pub fn for_mode(
        mode: SampleMode,
        live: PulseSource<'a>,
        simulated: SimulatedSource,
    ) -> Self {
        match mode {
            SampleMode::Live => Self::Live(live),
            SampleMode::Simulated => Self::Simulated(simulated),
        }
    }

    pub fn mode(&self) -> SampleMode {
        match self {
            Self::Live(_) => SampleMode::Live,
            Self::Simulated(_) => SampleMode::Simulated,
        }
    }
}

impl ReadingSource for MeterSource<'_> {
    fn sample(&mut self, now_us: u32) -> MeteringSnapshot {
        match self {
            Self::Live(src) => src.sample(now_us),
            Self::Simulated(src) => src.sample(now_us),
        }
    }
}
