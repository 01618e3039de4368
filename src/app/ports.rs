//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PlugService / Meter (domain)
//! ```
//!
//! Driven adapters (clock, relay, event sinks) implement these traits.
//! The [`PlugService`](super::service::PlugService) and the
//! [`Meter`](crate::metering::Meter) consume them via generics, so the
//! domain core never touches hardware directly.

use crate::error::ActuatorError;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: hardware timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.
///
/// Both counters are truncated to u32 and wrap; every consumer computes
/// durations with `wrapping_sub`.  Reads must never block.
pub trait ClockPort {
    /// Microseconds since boot (wraps every ~71.6 minutes).
    fn now_us(&self) -> u32;

    /// Milliseconds since boot (wraps every ~49.7 days).
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to switch the load.
pub trait RelayPort {
    /// Energise the relay (load on).
    fn relay_on(&mut self) -> Result<(), ActuatorError>;

    /// De-energise the relay (load off).
    fn relay_off(&mut self) -> Result<(), ActuatorError>;

    /// Last successfully commanded relay state.
    fn is_relay_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT
/// publish queue, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan-out: both sinks see every event, left first.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Configuration load/validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value is missing.
    NotFound(&'static str),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "missing value: {}", key),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound(msg) | ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}
