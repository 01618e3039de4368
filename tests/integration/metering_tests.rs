//! End-to-end metering: pulse edges → frequency → calibrated reading →
//! accumulated energy, driven by a mock clock.

use crate::mock_hw::MockClock;

use smartplug::app::ports::ClockPort;
use smartplug::config::{PlugConfig, SampleMode};
use smartplug::metering::pulse::PulseChannel;
use smartplug::metering::source::{PulseSource, ReadingSource};
use smartplug::metering::{Meter, MeterConfig, source_for};

fn live_meter<'a>(power: &'a PulseChannel, current: &'a PulseChannel) -> Meter<PulseSource<'a>> {
    let cfg = MeterConfig::from(&PlugConfig::default());
    Meter::new(PulseSource::new(power, current, cfg.estimator(), cfg.calibration))
}

/// Two edges `period_us` apart, the second at `at_us`.
fn pulse_pair(channel: &PulseChannel, at_us: u32, period_us: u32) {
    channel.record_edge(at_us.wrapping_sub(period_us));
    channel.record_edge(at_us);
}

fn approx(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

// ── Readings ──────────────────────────────────────────────────

#[test]
fn steady_1000us_period_reads_1200w() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    pulse_pair(&power, 1_001_000, 1_000);
    pulse_pair(&current, 1_001_000, 1_000);

    let clock = MockClock::at_us(1_001_500);
    let mut meter = live_meter(&power, &current);
    let reading = meter.tick(&clock);

    assert!(approx(reading.watts, 1_200.0, 1e-2), "got {} W", reading.watts);
    assert!(approx(reading.amps, 3.0, 1e-4), "got {} A", reading.amps);
    assert_eq!(meter.latest_watts(), reading.watts);
    assert_eq!(meter.latest_amps(), reading.amps);
}

#[test]
fn idle_for_three_seconds_reads_zero() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    pulse_pair(&power, 1_001_000, 1_000);
    pulse_pair(&current, 1_001_000, 1_000);

    let clock = MockClock::at_us(1_001_500);
    let mut meter = live_meter(&power, &current);
    assert!(meter.tick(&clock).watts > 0.0);

    clock.advance_us(3_000_000);
    let reading = meter.tick(&clock);
    assert_eq!(reading.watts, 0.0);
    assert_eq!(reading.amps, 0.0);
}

#[test]
fn staleness_boundary_is_inclusive() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    pulse_pair(&power, 5_000_000, 2_000);

    let clock = MockClock::at_us(7_000_000);
    let mut meter = live_meter(&power, &current);
    assert!(approx(meter.tick(&clock).watts, 600.0, 1e-2));

    clock.advance_us(1);
    assert_eq!(meter.tick(&clock).watts, 0.0);
}

#[test]
fn no_edges_or_single_edge_reads_zero() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    let clock = MockClock::at_us(10_000);
    let mut meter = live_meter(&power, &current);
    assert_eq!(meter.tick(&clock).watts, 0.0);

    power.record_edge(9_000);
    assert_eq!(meter.tick(&clock).watts, 0.0);
}

#[test]
fn period_across_timer_wrap_is_exact() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    power.record_edge(u32::MAX - 499);
    power.record_edge(500);
    assert_eq!(power.snapshot().last_period_us, 1_000);

    // now_us wrapped to 600: edge is 100 µs old.
    let clock = MockClock::at_us(u64::from(u32::MAX) + 1 + 600);
    assert_eq!(clock.now_us(), 600);
    let mut meter = live_meter(&power, &current);
    assert!(approx(meter.tick(&clock).watts, 1_200.0, 1e-2));
}

// ── Energy ────────────────────────────────────────────────────

#[test]
fn one_hour_at_1200w_is_1_2_kwh() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    let clock = MockClock::at_us(1_000_000);
    let mut meter = live_meter(&power, &current);

    meter.tick(&clock);
    for _ in 0..3_600 {
        clock.advance_ms(1_000);
        pulse_pair(&power, clock.now_us(), 1_000);
        pulse_pair(&current, clock.now_us(), 1_000);
        meter.tick(&clock);
    }

    let kwh = meter.read_and_reset_energy(&clock);
    assert!((kwh - 1.2).abs() < 1e-6, "got {kwh} kWh");
}

#[test]
fn cold_start_after_long_uptime_adds_nothing() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    let clock = MockClock::at_us(3_000_000_000);
    pulse_pair(&power, clock.now_us(), 1_000);

    let mut meter = live_meter(&power, &current);
    meter.tick(&clock);
    assert_eq!(meter.pending_energy_kwh(), 0.0);
}

#[test]
fn second_read_and_reset_returns_zero() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    let clock = MockClock::at_us(1_000_000);
    let mut meter = live_meter(&power, &current);
    meter.tick(&clock);

    clock.advance_ms(1_000);
    pulse_pair(&power, clock.now_us(), 1_000);
    assert!(meter.read_and_reset_energy(&clock) > 0.0);
    assert_eq!(meter.read_and_reset_energy(&clock), 0.0);
}

#[test]
fn signal_loss_stops_accumulation() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    let clock = MockClock::at_us(1_000_000);
    let mut meter = live_meter(&power, &current);

    pulse_pair(&power, clock.now_us(), 1_000);
    meter.tick(&clock);
    clock.advance_ms(10_000);
    meter.tick(&clock);

    // Edge is now 10 s old: the reading is zero, so no energy was added.
    assert_eq!(meter.latest_watts(), 0.0);
    assert_eq!(meter.pending_energy_kwh(), 0.0);
}

// ── Simulated mode ────────────────────────────────────────────

#[test]
fn simulated_readings_stay_in_range_and_follow_voltage() {
    let power = PulseChannel::new();
    let current = PulseChannel::new();
    let cfg = PlugConfig {
        sample_mode: SampleMode::Simulated,
        simulated_watts_min: 100.0,
        simulated_watts_max: 200.0,
        ..PlugConfig::default()
    };
    let mut source = source_for(&cfg, &power, &current, 42);

    for t in 0..200u32 {
        let r = source.sample(t * 1_000);
        assert!((100.0..=200.0).contains(&r.watts), "{} W out of range", r.watts);
        assert!(approx(r.amps, r.watts / 120.0, 1e-5));
    }
}
