//! GPIO pin assignments for the SmartPlug main board (ESP32-WROOM).
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// HLW8012 energy-metering chip
// ---------------------------------------------------------------------------

/// `CF` output: pulse frequency proportional to active power.
pub const METER_CF_GPIO: i32 = 25;
/// `CF1` output: pulse frequency proportional to RMS current
/// (with `SEL` tied for current mode).
pub const METER_CF1_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// Load switching
// ---------------------------------------------------------------------------

/// Relay coil driver (active HIGH = load energised).
pub const RELAY_GPIO: i32 = 33;

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// External status LED, flashed when a remote command arrives.
pub const LED_EXTERNAL_GPIO: i32 = 14;
