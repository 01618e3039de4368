//! Time-integrated energy accumulation with read-and-reset.
//!
//! ```text
//!   Uninitialized ──first tick (baseline only)──▶ Running ──tick──▶ Running
//!                                                   │
//!                                 take(): capture total, zero it
//! ```
//!
//! Each tick multiplies the *current* power by the wall-clock time since
//! the previous tick.  The very first tick has no meaningful baseline and
//! only records the timestamp.

use log::debug;

const MS_PER_HOUR: f64 = 3_600_000.0;
const WATTS_PER_KW: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccumulatorState {
    Uninitialized,
    Running { last_sample_ms: u32 },
}

/// Running kWh total plus the time of the last integration step.
#[derive(Debug, Clone)]
pub struct EnergyAccumulator {
    state: AccumulatorState,
    total_kwh: f64,
}

impl EnergyAccumulator {
    pub const fn new() -> Self {
        Self {
            state: AccumulatorState::Uninitialized,
            total_kwh: 0.0,
        }
    }

    /// Integrate `power_w` over the time since the previous tick.
    ///
    /// Returns the energy added by this step (kWh).  Elapsed time uses
    /// wrapping subtraction so the ~49-day rollover of a u32 millisecond
    /// counter does not produce a spurious spike.
    pub fn tick(&mut self, power_w: f32, now_ms: u32) -> f64 {
        match self.state {
            AccumulatorState::Uninitialized => {
                self.state = AccumulatorState::Running {
                    last_sample_ms: now_ms,
                };
                debug!("energy: baseline set at {} ms", now_ms);
                0.0
            }
            AccumulatorState::Running { last_sample_ms } => {
                let elapsed_ms = now_ms.wrapping_sub(last_sample_ms);
                let delta_kwh = energy_delta_kwh(power_w, elapsed_ms);
                self.total_kwh += delta_kwh;
                self.state = AccumulatorState::Running {
                    last_sample_ms: now_ms,
                };
                debug!(
                    "energy: +{:.9} kWh over {} ms at {:.1} W (total {:.9} kWh)",
                    delta_kwh, elapsed_ms, power_w, self.total_kwh
                );
                delta_kwh
            }
        }
    }

    /// Capture the running total and zero it.
    ///
    /// Callers integrate first (see `Meter::read_and_reset_energy`); the
    /// exclusive borrow keeps any other tick from landing between the
    /// capture and the reset.
    pub fn take(&mut self) -> f64 {
        core::mem::replace(&mut self.total_kwh, 0.0)
    }

    /// Current running total without resetting it.
    pub fn total_kwh(&self) -> f64 {
        self.total_kwh
    }

    /// `true` once the first tick has recorded a baseline.
    pub fn is_running(&self) -> bool {
        matches!(self.state, AccumulatorState::Running { .. })
    }
}

impl Default for EnergyAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Energy (kWh) delivered by `power_w` sustained for `elapsed_ms`.
pub fn energy_delta_kwh(power_w: f32, elapsed_ms: u32) -> f64 {
    let hours = f64::from(elapsed_ms) / MS_PER_HOUR;
    f64::from(power_w) * hours / WATTS_PER_KW
}
