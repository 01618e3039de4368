//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART in production, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | E+={:.6}kWh | V={:.1} | I={:.3}A | P={:.1}W | relay={}",
                    t.energy_increment_kwh,
                    t.voltage,
                    t.current_a,
                    t.power_w,
                    on_off(t.relay_on),
                );
            }
            AppEvent::RelayChanged { on } => {
                info!("RELAY | now {}", on_off(*on));
            }
            AppEvent::RelayStatus { on } => {
                info!("RELAY | status {}", on_off(*on));
            }
            AppEvent::CommandFailed { command, error } => {
                warn!("CMD | {:?} failed: {}", command, error);
            }
            AppEvent::Started { relay_on } => {
                info!("START | relay={}", on_off(*relay_on));
            }
        }
    }
}
