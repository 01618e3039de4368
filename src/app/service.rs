//! Application service — the hexagonal core.
//!
//! [`PlugService`] owns the [`Meter`] and the telemetry cadence.  It
//! exposes a hardware-agnostic API; all I/O flows through port traits
//! injected at call sites, making the whole service testable with mock
//! adapters.
//!
//! ```text
//!    ClockPort ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!                  │       PlugService        │
//!    RelayPort ◀── │  Meter · telemetry timer │
//!                  └─────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::PlugConfig;
use crate::metering::source::ReadingSource;
use crate::metering::{Meter, MeteringSnapshot};

use super::commands::PlugCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{ClockPort, EventSink, RelayPort};

// ───────────────────────────────────────────────────────────────
// PlugService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates metering, reporting and relay
/// control.
pub struct PlugService<S> {
    meter: Meter<S>,
    config: PlugConfig,
    /// Time of the last telemetry report; `None` until the first tick.
    last_report_ms: Option<u32>,
    reports_sent: u64,
}

impl<S: ReadingSource> PlugService<S> {
    /// Construct the service around a reading source.
    ///
    /// Does **not** emit anything — call [`start`](Self::start) next.
    pub fn new(config: PlugConfig, source: S) -> Self {
        Self::with_meter(config, Meter::new(source))
    }

    /// Construct around an already-initialised meter (see
    /// [`metering::initialize`](crate::metering::initialize)).
    pub fn with_meter(config: PlugConfig, meter: Meter<S>) -> Self {
        Self {
            meter,
            config,
            last_report_ms: None,
            reports_sent: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce start-up with the relay's initial state.
    pub fn start(&mut self, hw: &impl RelayPort, sink: &mut impl EventSink) {
        let relay_on = hw.is_relay_on();
        sink.emit(&AppEvent::Started { relay_on });
        info!(
            "PlugService started (relay {}, telemetry every {} ms)",
            if relay_on { "ON" } else { "OFF" },
            self.config.telemetry_interval_ms
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one hardware-loop cycle: meter tick, then telemetry if due.
    ///
    /// Returns the report when one was emitted on this tick.
    pub fn tick(
        &mut self,
        clock: &impl ClockPort,
        hw: &impl RelayPort,
        sink: &mut impl EventSink,
    ) -> Option<TelemetryData> {
        let now_ms = clock.now_ms();

        let Some(last) = self.last_report_ms else {
            // First tick: baseline for both energy and the report timer.
            self.meter.tick(clock);
            self.last_report_ms = Some(now_ms);
            return None;
        };

        if now_ms.wrapping_sub(last) < self.config.telemetry_interval_ms {
            self.meter.tick(clock);
            return None;
        }

        // The read integrates up to `now`, so no separate tick is needed.
        let report = self.build_report(clock, hw);
        self.last_report_ms = Some(now_ms);
        self.reports_sent += 1;
        sink.emit(&AppEvent::Telemetry(report));
        Some(report)
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from MQTT or the serial console).
    ///
    /// Actuator failures are reported as events; they never interrupt
    /// metering.
    pub fn handle_command(
        &mut self,
        cmd: PlugCommand,
        hw: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) {
        let was_on = hw.is_relay_on();
        let result = match cmd {
            PlugCommand::RelayOn => hw.relay_on(),
            PlugCommand::RelayOff => hw.relay_off(),
            PlugCommand::RelayStatus => {
                sink.emit(&AppEvent::RelayStatus { on: was_on });
                return;
            }
        };

        match result {
            Ok(()) => {
                let on = hw.is_relay_on();
                if on != was_on {
                    info!("Relay turned {}", if on { "ON" } else { "OFF" });
                    sink.emit(&AppEvent::RelayChanged { on });
                }
            }
            Err(error) => {
                warn!("Command {:?} failed: {}", cmd, error);
                sink.emit(&AppEvent::CommandFailed {
                    command: cmd,
                    error,
                });
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Latest calibrated reading.
    pub fn snapshot(&self) -> MeteringSnapshot {
        self.meter.snapshot()
    }

    /// Telemetry reports emitted since construction.
    pub fn reports_sent(&self) -> u64 {
        self.reports_sent
    }

    pub fn config(&self) -> &PlugConfig {
        &self.config
    }

    pub fn meter(&self) -> &Meter<S> {
        &self.meter
    }

    // ── Internal ──────────────────────────────────────────────

    fn build_report(&mut self, clock: &impl ClockPort, hw: &impl RelayPort) -> TelemetryData {
        let energy_increment_kwh = self.meter.read_and_reset_energy(clock);
        let reading = self.meter.snapshot();
        TelemetryData {
            energy_increment_kwh,
            voltage: self.config.nominal_line_voltage,
            current_a: reading.amps,
            power_w: reading.watts,
            relay_on: hw.is_relay_on(),
        }
    }
}
