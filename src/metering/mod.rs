//! Pulse-frequency energy metering pipeline.
//!
//! ```text
//!  CF / CF1 rising edges
//!        │  (GPIO ISR)
//!        ▼
//!  PulseChannel ──snapshot──▶ FrequencyEstimator ──Hz──▶ Calibration ──(A, W)──┐
//!                                                                              ▼
//!                     Meter::tick ◀───────────── ReadingSource ◀───────────────┘
//!                         │
//!                         ▼
//!                  EnergyAccumulator (kWh, read-and-reset)
//! ```
//!
//! The [`Meter`] owns everything except the two ISR-facing
//! [`PulseChannel`]s, which it borrows.  It never schedules itself: the
//! caller decides the cadence, and should tick at least once per
//! accumulation interval for accurate energy totals.

pub mod calibration;
pub mod energy;
pub mod frequency;
pub mod pulse;
pub mod source;

use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::app::ports::ClockPort;
use crate::config::PlugConfig;
use crate::drivers::hw_init::init_pulse_isrs;
use crate::error::Result;
use calibration::Calibration;
use energy::EnergyAccumulator;
use frequency::FrequencyEstimator;
use pulse::PulseChannel;
use source::{MeterSource, PulseSource, ReadingSource, SimulatedSource};

/// Latest calibrated reading.  Superseded on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeteringSnapshot {
    /// RMS current (A).
    pub amps: f32,
    /// Active power (W).
    pub watts: f32,
}

/// Construction-time metering constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterConfig {
    pub calibration: Calibration,
    pub stale_timeout_us: u32,
}

impl MeterConfig {
    pub fn estimator(&self) -> FrequencyEstimator {
        FrequencyEstimator::new(self.stale_timeout_us)
    }
}

impl From<&PlugConfig> for MeterConfig {
    fn from(cfg: &PlugConfig) -> Self {
        Self {
            calibration: Calibration::new(cfg.power_cal_w_per_hz, cfg.current_cal_a_per_hz),
            stale_timeout_us: cfg.stale_timeout_us,
        }
    }
}

/// Build the reading source selected by `cfg.sample_mode`.
///
/// `seed` only matters for the simulated source.
pub fn source_for<'a>(
    cfg: &PlugConfig,
    power: &'a PulseChannel,
    current: &'a PulseChannel,
    seed: u64,
) -> MeterSource<'a> {
    let meter_cfg = MeterConfig::from(cfg);
    let live = PulseSource::new(power, current, meter_cfg.estimator(), meter_cfg.calibration);
    let simulated = SimulatedSource::new(
        seed,
        cfg.simulated_watts_min,
        cfg.simulated_watts_max,
        cfg.nominal_line_voltage,
    );
    MeterSource::for_mode(cfg.sample_mode, live, simulated)
}

/// Set once the pulse ISRs are attached; they are never detached.
static ISRS_ATTACHED: AtomicBool = AtomicBool::new(false);

/// Attach the pulse ISRs and build a meter over the static channels.
///
/// The ISRs are attached on the first successful call only; later calls
/// just build another meter reading the same channels.  The channels are
/// never written from here, so the ISR stays their only writer.  In
/// simulated mode the ISRs are still attached so a later switch to live
/// readings needs no re-wiring.
pub fn initialize(
    cfg: &PlugConfig,
    cf_gpio: i32,
    cf1_gpio: i32,
    seed: u64,
) -> Result<Meter<MeterSource<'static>>> {
    if ISRS_ATTACHED.swap(true, Ordering::AcqRel) {
        debug!("meter: pulse ISRs already attached");
    } else if let Err(e) = init_pulse_isrs(cf_gpio, cf1_gpio) {
        ISRS_ATTACHED.store(false, Ordering::Release);
        return Err(e.into());
    }
    let source = source_for(cfg, &pulse::POWER_PULSES, &pulse::CURRENT_PULSES, seed);
    info!(
        "meter: initialised ({:?}, {} W/Hz, {} A/Hz)",
        cfg.sample_mode, cfg.power_cal_w_per_hz, cfg.current_cal_a_per_hz
    );
    Ok(Meter::new(source))
}

/// Metering facade: drives source → snapshot → energy on each tick.
pub struct Meter<S> {
    source: S,
    latest: MeteringSnapshot,
    energy: EnergyAccumulator,
}

impl<S: ReadingSource> Meter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            latest: MeteringSnapshot::default(),
            energy: EnergyAccumulator::new(),
        }
    }

    /// Advance the pipeline by one step.
    ///
    /// Refreshes both channels' readings, then integrates the new power
    /// reading.  The first call only establishes the energy baseline.
    pub fn tick(&mut self, clock: &impl ClockPort) -> MeteringSnapshot {
        let now_us = clock.now_us();
        let now_ms = clock.now_ms();

        self.latest = self.source.sample(now_us);
        self.energy.tick(self.latest.watts, now_ms);

        debug!(
            "meter: {:.3} A | {:.1} W | {:.9} kWh pending",
            self.latest.amps,
            self.latest.watts,
            self.energy.total_kwh()
        );
        self.latest
    }

    /// Integrate once more, then return and zero the energy total (kWh).
    ///
    /// Takes `&mut self`, so no other tick can interleave between the final
    /// integration, the capture and the reset.
    pub fn read_and_reset_energy(&mut self, clock: &impl ClockPort) -> f64 {
        self.tick(clock);
        self.energy.take()
    }

    pub fn latest_amps(&self) -> f32 {
        self.latest.amps
    }

    pub fn latest_watts(&self) -> f32 {
        self.latest.watts
    }

    pub fn snapshot(&self) -> MeteringSnapshot {
        self.latest
    }

    /// Energy accumulated since the last read-and-reset (kWh), not cleared.
    pub fn pending_energy_kwh(&self) -> f64 {
        self.energy.total_kwh()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct FixedClock {
        us: Cell<u32>,
        ms: Cell<u32>,
    }

    impl FixedClock {
        fn new() -> Self {
            Self {
                us: Cell::new(0),
                ms: Cell::new(0),
            }
        }

        fn set(&self, ms: u32) {
            self.ms.set(ms);
            self.us.set(ms.wrapping_mul(1_000));
        }
    }

    impl ClockPort for FixedClock {
        fn now_us(&self) -> u32 {
            self.us.get()
        }
        fn now_ms(&self) -> u32 {
            self.ms.get()
        }
    }

    struct ConstantLoad(f32);

    impl ReadingSource for ConstantLoad {
        fn sample(&mut self, _now_us: u32) -> MeteringSnapshot {
            MeteringSnapshot {
                amps: self.0 / 120.0,
                watts: self.0,
            }
        }
    }

    #[test]
    fn cold_start_tick_accumulates_nothing() {
        let clock = FixedClock::new();
        clock.set(86_400_000);
        let mut meter = Meter::new(ConstantLoad(2_000.0));
        meter.tick(&clock);
        assert_eq!(meter.pending_energy_kwh(), 0.0);
        assert!((meter.latest_watts() - 2_000.0).abs() < 1e-6);
    }

    #[test]
    fn read_and_reset_twice_returns_zero_second_time() {
        let clock = FixedClock::new();
        let mut meter = Meter::new(ConstantLoad(1_200.0));
        meter.tick(&clock);
        clock.set(60_000);
        let first = meter.read_and_reset_energy(&clock);
        assert!(first > 0.0);
        assert_eq!(meter.read_and_reset_energy(&clock), 0.0);
    }

    #[test]
    fn read_and_reset_integrates_up_to_now() {
        let clock = FixedClock::new();
        let mut meter = Meter::new(ConstantLoad(1_000.0));
        meter.tick(&clock);
        clock.set(3_600_000);
        // No intermediate tick: the read itself must integrate the hour.
        let kwh = meter.read_and_reset_energy(&clock);
        assert!((kwh - 1.0).abs() < 1e-9);
    }

    #[test]
    fn source_for_follows_sample_mode() {
        let power = PulseChannel::new();
        let current = PulseChannel::new();
        let mut cfg = PlugConfig::default();
        assert_eq!(
            source_for(&cfg, &power, &current, 0).mode(),
            crate::config::SampleMode::Live
        );
        cfg.sample_mode = crate::config::SampleMode::Simulated;
        assert_eq!(
            source_for(&cfg, &power, &current, 0).mode(),
            crate::config::SampleMode::Simulated
        );
    }

    #[cfg(not(target_os = "espidf"))]
    #[test]
    fn initialize_builds_meter_for_configured_mode() {
        let cfg = PlugConfig {
            sample_mode: crate::config::SampleMode::Simulated,
            ..PlugConfig::default()
        };
        let meter = initialize(&cfg, 25, 26, 7).unwrap();
        assert_eq!(meter.source().mode(), crate::config::SampleMode::Simulated);
        assert_eq!(meter.snapshot(), MeteringSnapshot::default());
    }

    #[cfg(not(target_os = "espidf"))]
    #[test]
    fn repeated_initialize_leaves_captured_edges_alone() {
        pulse::current_pulse_isr(1_000);
        pulse::current_pulse_isr(11_000);
        let before = pulse::CURRENT_PULSES.snapshot();
        assert_eq!(before.last_period_us, 10_000);

        let cfg = PlugConfig::default();
        initialize(&cfg, 25, 26, 1).unwrap();
        initialize(&cfg, 25, 26, 2).unwrap();

        assert_eq!(pulse::CURRENT_PULSES.snapshot(), before);
        assert!(ISRS_ATTACHED.load(Ordering::Acquire));
    }
}
