//! Load relay driver.
//!
//! A single digital output drives the relay coil transistor: HIGH = load
//! energised.  Generic over `embedded_hal::digital::OutputPin`, so the
//! firmware passes an `esp_idf_hal` `PinDriver` and tests pass a mock.
//!
//! The cached state only changes after the pin write succeeds.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Off,
    On,
}

pub struct RelayDriver<P> {
    pin: P,
    state: RelayState,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Take ownership of the pin and force the relay off.
    pub fn new(mut pin: P) -> Result<Self, ActuatorError> {
        pin.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        Ok(Self {
            pin,
            state: RelayState::Off,
        })
    }

    pub fn turn_on(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_high().map_err(|_| {
            warn!("relay: GPIO set_high failed");
            ActuatorError::GpioWriteFailed
        })?;
        self.state = RelayState::On;
        Ok(())
    }

    pub fn turn_off(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_low().map_err(|_| {
            warn!("relay: GPIO set_low failed");
            ActuatorError::GpioWriteFailed
        })?;
        self.state = RelayState::Off;
        Ok(())
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == RelayState::On
    }
}
