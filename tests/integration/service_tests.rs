//! PlugService integration: command dispatch to the relay, telemetry
//! cadence, and the channel hand-off to the messaging side.

use crate::mock_hw::{MockClock, MockPin, MockRelay, RecordingSink, RelayCall};

use smartplug::adapters::hardware::HardwareAdapter;
use smartplug::adapters::mqtt::{
    ChannelTelemetrySink, TelemetryLink, TelemetryOutbox, encode_telemetry,
};
use smartplug::app::commands::PlugCommand;
use smartplug::app::events::AppEvent;
use smartplug::app::service::PlugService;
use smartplug::channels::{CommandChannel, TelemetryChannel, drain_commands, submit_command};
use smartplug::config::PlugConfig;
use smartplug::drivers::indicator::{DEFAULT_FLASH_MS, Indicator};
use smartplug::drivers::relay::RelayDriver;
use smartplug::error::{ActuatorError, CommsError};
use smartplug::metering::MeteringSnapshot;
use smartplug::metering::source::ReadingSource;

struct ConstantLoad(f32);

impl ReadingSource for ConstantLoad {
    fn sample(&mut self, _now_us: u32) -> MeteringSnapshot {
        MeteringSnapshot {
            amps: self.0 / 120.0,
            watts: self.0,
        }
    }
}

fn make_service(watts: f32) -> (PlugService<ConstantLoad>, MockRelay, RecordingSink) {
    let mut svc = PlugService::new(PlugConfig::default(), ConstantLoad(watts));
    let relay = MockRelay::new();
    let mut sink = RecordingSink::new();
    svc.start(&relay, &mut sink);
    (svc, relay, sink)
}

/// Tick every `hardware_loop_interval_ms` for `secs` seconds.
fn run_for(
    svc: &mut PlugService<ConstantLoad>,
    clock: &MockClock,
    relay: &MockRelay,
    sink: &mut RecordingSink,
    secs: u64,
) {
    let step = u64::from(svc.config().hardware_loop_interval_ms);
    for _ in 0..(secs * 1_000 / step) {
        clock.advance_ms(step);
        svc.tick(clock, relay, sink);
    }
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn start_announces_relay_state() {
    let (_svc, _relay, sink) = make_service(0.0);
    assert_eq!(sink.events, vec![AppEvent::Started { relay_on: false }]);
}

#[test]
fn on_then_off_drives_relay_and_reports_changes() {
    let (mut svc, mut relay, mut sink) = make_service(0.0);

    svc.handle_command(PlugCommand::RelayOn, &mut relay, &mut sink);
    svc.handle_command(PlugCommand::RelayOff, &mut relay, &mut sink);

    assert_eq!(relay.calls, vec![RelayCall::On, RelayCall::Off]);
    assert_eq!(
        &sink.events[1..],
        &[
            AppEvent::RelayChanged { on: true },
            AppEvent::RelayChanged { on: false },
        ]
    );
}

#[test]
fn repeated_on_does_not_report_a_change() {
    let (mut svc, mut relay, mut sink) = make_service(0.0);
    svc.handle_command(PlugCommand::RelayOn, &mut relay, &mut sink);
    svc.handle_command(PlugCommand::RelayOn, &mut relay, &mut sink);

    assert_eq!(relay.calls.len(), 2);
    let changes = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::RelayChanged { .. }))
        .count();
    assert_eq!(changes, 1);
}

#[test]
fn status_query_touches_nothing() {
    let (mut svc, mut relay, mut sink) = make_service(0.0);
    svc.handle_command(PlugCommand::RelayStatus, &mut relay, &mut sink);

    assert!(relay.calls.is_empty());
    assert_eq!(sink.events.last(), Some(&AppEvent::RelayStatus { on: false }));
}

#[test]
fn actuator_failure_is_reported_and_metering_continues() {
    let mut svc = PlugService::new(PlugConfig::default(), ConstantLoad(600.0));
    let mut relay = MockRelay::broken();
    let mut sink = RecordingSink::new();
    let clock = MockClock::new();

    svc.tick(&clock, &relay, &mut sink);
    svc.handle_command(PlugCommand::RelayOn, &mut relay, &mut sink);
    assert!(!relay.on);
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::CommandFailed {
            command: PlugCommand::RelayOn,
            error: ActuatorError::GpioWriteFailed,
        })
    );

    run_for(&mut svc, &clock, &relay, &mut sink, 15);
    assert_eq!(sink.telemetry_count(), 1);
}

// ── Telemetry cadence ─────────────────────────────────────────

#[test]
fn reports_every_fifteen_seconds() {
    let (mut svc, relay, mut sink) = make_service(1_200.0);
    let clock = MockClock::new();
    svc.tick(&clock, &relay, &mut sink);

    run_for(&mut svc, &clock, &relay, &mut sink, 14);
    assert_eq!(sink.telemetry_count(), 0);

    run_for(&mut svc, &clock, &relay, &mut sink, 31);
    assert_eq!(sink.telemetry_count(), 3);
    assert_eq!(svc.reports_sent(), 3);
}

#[test]
fn report_increments_sum_to_total_energy() {
    let (mut svc, relay, mut sink) = make_service(1_200.0);
    let clock = MockClock::new();
    svc.tick(&clock, &relay, &mut sink);
    run_for(&mut svc, &clock, &relay, &mut sink, 45);

    let total: f64 = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Telemetry(t) => Some(t.energy_increment_kwh),
            _ => None,
        })
        .sum();
    // 1200 W for 45 s
    assert!((total - 0.015).abs() < 1e-9, "got {total} kWh");
}

#[test]
fn report_reflects_relay_state() {
    let (mut svc, mut relay, mut sink) = make_service(60.0);
    let clock = MockClock::new();
    svc.tick(&clock, &relay, &mut sink);
    svc.handle_command(PlugCommand::RelayOn, &mut relay, &mut sink);

    clock.advance_ms(15_000);
    let report = svc.tick(&clock, &relay, &mut sink).unwrap();
    assert!(report.relay_on);
    assert!((report.current_a - 0.5).abs() < 1e-6);
}

// ── Channel hand-off ──────────────────────────────────────────

#[test]
fn telemetry_reaches_outbound_queue_and_encodes() {
    let queue = TelemetryChannel::new();
    let mut svc = PlugService::new(PlugConfig::default(), ConstantLoad(600.0));
    let relay = MockRelay::new();
    let mut sink = (RecordingSink::new(), ChannelTelemetrySink::new(&queue));
    let clock = MockClock::new();

    svc.tick(&clock, &relay, &mut sink);
    clock.advance_ms(15_000);
    svc.tick(&clock, &relay, &mut sink);

    let report = queue.try_receive().unwrap();
    assert!(queue.try_receive().is_err());
    assert_eq!(sink.0.telemetry_count(), 1);

    let json: serde_json::Value =
        serde_json::from_slice(&encode_telemetry(&report, "plug-01").unwrap()).unwrap();
    assert_eq!(json["deviceName"], "plug-01");
    assert_eq!(json["power"], 600.0);
    assert!((json["energyIncrement"].as_f64().unwrap() - 0.0025).abs() < 1e-12);
}

struct BrokerLink {
    payloads: Vec<serde_json::Value>,
    online: bool,
}

impl TelemetryLink for BrokerLink {
    fn publish(&mut self, payload: &[u8]) -> Result<(), CommsError> {
        if !self.online {
            return Err(CommsError::MqttPublishFailed);
        }
        self.payloads.push(serde_json::from_slice(payload).unwrap());
        Ok(())
    }
}

#[test]
fn energy_survives_a_broker_outage() {
    let queue = TelemetryChannel::new();
    let mut svc = PlugService::new(PlugConfig::default(), ConstantLoad(1_200.0));
    let relay = MockRelay::new();
    let mut sink = (RecordingSink::new(), ChannelTelemetrySink::new(&queue));
    let clock = MockClock::new();
    let mut outbox = TelemetryOutbox::new();
    let mut link = BrokerLink {
        payloads: Vec::new(),
        online: false,
    };

    svc.tick(&clock, &relay, &mut sink);
    for _ in 0..3 {
        clock.advance_ms(15_000);
        svc.tick(&clock, &relay, &mut sink);
        // Broker down: nothing leaves the queue.
        assert_eq!(outbox.flush(&queue, &mut link, "plug-01", false).unwrap(), 0);
    }
    // Session reports up but the publish itself fails once.
    assert!(outbox.flush(&queue, &mut link, "plug-01", true).is_err());

    link.online = true;
    assert_eq!(outbox.flush(&queue, &mut link, "plug-01", true).unwrap(), 3);
    assert_eq!(sink.1.dropped(), 0);

    let total: f64 = link
        .payloads
        .iter()
        .map(|p| p["energyIncrement"].as_f64().unwrap())
        .sum();
    // 1200 W for 45 s
    assert!((total - 0.015).abs() < 1e-9, "got {total} kWh");
}

#[test]
fn queued_commands_drive_real_relay_driver() {
    let relay_pin = MockPin::new();
    let led_pin = MockPin::new();
    let mut hw = HardwareAdapter::new(
        RelayDriver::new(relay_pin.clone()).unwrap(),
        Indicator::new(led_pin.clone(), DEFAULT_FLASH_MS),
    );
    let mut svc = PlugService::new(PlugConfig::default(), ConstantLoad(0.0));
    let mut sink = RecordingSink::new();
    let commands = CommandChannel::new();

    for line in ["on", "bogus", ""] {
        if let Ok(Some(cmd)) = PlugCommand::parse_serial(line) {
            submit_command(&commands, cmd).unwrap();
        }
    }
    if let Some(cmd) = PlugCommand::from_topic("plug-01/cmd/relay/off", "plug-01/#") {
        submit_command(&commands, cmd).unwrap();
    }
    if let Some(cmd) = PlugCommand::from_topic("plug-02/cmd/relay/on", "plug-01/#") {
        submit_command(&commands, cmd).unwrap();
    }

    // First drained command flips the relay; check before the second.
    let cmd = commands.try_receive().unwrap();
    hw.acknowledge(0);
    svc.handle_command(cmd, &mut hw, &mut sink);
    assert!(relay_pin.is_high());
    assert!(led_pin.is_high());

    let ran = drain_commands(&commands, |cmd| svc.handle_command(cmd, &mut hw, &mut sink));
    assert_eq!(ran, 1);
    assert!(!relay_pin.is_high());

    hw.poll(DEFAULT_FLASH_MS);
    assert!(!led_pin.is_high());
    assert!(!hw.indicator_lit());
}
