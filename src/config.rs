//! System configuration parameters
//!
//! All tunable parameters for the SmartPlug firmware.  Calibration factors
//! are board-specific and should be re-measured after assembly.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::metering::calibration::{DEFAULT_CURRENT_A_PER_HZ, DEFAULT_POWER_W_PER_HZ};
use crate::metering::frequency::DEFAULT_STALE_TIMEOUT_US;

/// Where metering readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleMode {
    /// Calibrated HLW8012 pulse readings.
    Live,
    /// Synthetic random load (bench testing without the metering chip).
    Simulated,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlugConfig {
    // --- Metering ---
    /// `CF` pulse frequency → active power (W per Hz)
    pub power_cal_w_per_hz: f32,
    /// `CF1` pulse frequency → RMS current (A per Hz)
    pub current_cal_a_per_hz: f32,
    /// Age after which the last pulse edge no longer counts (µs)
    pub stale_timeout_us: u32,
    /// Live sensor or simulated readings
    pub sample_mode: SampleMode,
    /// Reported line voltage; also converts simulated watts to amps (V)
    pub nominal_line_voltage: f32,
    /// Simulated load lower bound (W)
    pub simulated_watts_min: f32,
    /// Simulated load upper bound (W)
    pub simulated_watts_max: f32,

    // --- Timing ---
    /// Hardware task loop period (milliseconds)
    pub hardware_loop_interval_ms: u32,
    /// Telemetry publish interval (milliseconds)
    pub telemetry_interval_ms: u32,
    /// Messaging task connection-check period (milliseconds)
    pub messaging_poll_interval_ms: u32,

    // --- Messaging ---
    /// MQTT broker TCP port
    pub mqtt_port: u16,
}

impl Default for PlugConfig {
    fn default() -> Self {
        Self {
            // Metering
            power_cal_w_per_hz: DEFAULT_POWER_W_PER_HZ,
            current_cal_a_per_hz: DEFAULT_CURRENT_A_PER_HZ,
            stale_timeout_us: DEFAULT_STALE_TIMEOUT_US,
            sample_mode: SampleMode::Live,
            nominal_line_voltage: 120.0,
            simulated_watts_min: 0.0,
            simulated_watts_max: 2000.0,

            // Timing
            hardware_loop_interval_ms: 100,  // 10 Hz
            telemetry_interval_ms: 15_000,   // every 15 s
            messaging_poll_interval_ms: 500, // 2 Hz

            // Messaging
            mqtt_port: 1883,
        }
    }
}

impl PlugConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.power_cal_w_per_hz > 0.0 && self.power_cal_w_per_hz.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "power_cal_w_per_hz must be positive",
            ));
        }
        if !(self.current_cal_a_per_hz > 0.0 && self.current_cal_a_per_hz.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "current_cal_a_per_hz must be positive",
            ));
        }
        if self.stale_timeout_us == 0 {
            return Err(ConfigError::ValidationFailed(
                "stale_timeout_us must be non-zero",
            ));
        }
        if !(self.nominal_line_voltage > 0.0 && self.nominal_line_voltage.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "nominal_line_voltage must be positive",
            ));
        }
        if !(self.simulated_watts_min.is_finite() && self.simulated_watts_max.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "simulated watts range must be finite",
            ));
        }
        if !(0.0 <= self.simulated_watts_min && self.simulated_watts_min <= self.simulated_watts_max)
        {
            return Err(ConfigError::ValidationFailed(
                "simulated watts range must satisfy 0 <= min <= max",
            ));
        }
        if self.hardware_loop_interval_ms == 0 || self.messaging_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "loop intervals must be non-zero",
            ));
        }
        if self.telemetry_interval_ms < self.hardware_loop_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_ms must not be shorter than the hardware loop",
            ));
        }
        Ok(())
    }
}
