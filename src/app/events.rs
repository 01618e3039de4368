//! Outbound application events.
//!
//! The [`PlugService`](super::service::PlugService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, queue for MQTT
//! publish, etc.

use super::commands::PlugCommand;
use crate::error::ActuatorError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Periodic telemetry report (energy since the previous report).
    Telemetry(TelemetryData),

    /// The relay changed state.
    RelayChanged { on: bool },

    /// Answer to a status query.
    RelayStatus { on: bool },

    /// A command could not be carried out.
    CommandFailed {
        command: PlugCommand,
        error: ActuatorError,
    },

    /// The application service has started (carries initial relay state).
    Started { relay_on: bool },
}

/// A point-in-time telemetry report suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    /// Energy consumed since the previous report (kWh).
    pub energy_increment_kwh: f64,
    /// Nominal line voltage (V).
    pub voltage: f32,
    /// Latest RMS current (A).
    pub current_a: f32,
    /// Latest active power (W).
    pub power_w: f32,
    /// Relay state at report time.
    pub relay_on: bool,
}
