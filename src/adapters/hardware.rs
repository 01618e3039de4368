//! Hardware adapter: bridges the relay and indicator drivers to the
//! [`RelayPort`] trait.
//!
//! Generic over the pin types so the firmware passes `PinDriver`s and the
//! integration tests pass mock pins.  Metering inputs are not owned here;
//! they arrive through the ISR-fed pulse channels.

use embedded_hal::digital::OutputPin;

use crate::app::ports::RelayPort;
use crate::drivers::indicator::Indicator;
use crate::drivers::relay::RelayDriver;
use crate::error::ActuatorError;

pub struct HardwareAdapter<R, L> {
    relay: RelayDriver<R>,
    led: Indicator<L>,
}

impl<R: OutputPin, L: OutputPin> HardwareAdapter<R, L> {
    pub fn new(relay: RelayDriver<R>, led: Indicator<L>) -> Self {
        Self { relay, led }
    }

    /// Flash the indicator to acknowledge a remote command.
    pub fn acknowledge(&mut self, now_ms: u32) {
        self.led.flash(now_ms);
    }

    /// Advance time-based outputs (LED flash timeout).
    pub fn poll(&mut self, now_ms: u32) {
        self.led.tick(now_ms);
    }

    pub fn indicator_lit(&self) -> bool {
        self.led.is_lit()
    }
}

impl<R: OutputPin, L: OutputPin> RelayPort for HardwareAdapter<R, L> {
    fn relay_on(&mut self) -> Result<(), ActuatorError> {
        self.relay.turn_on()
    }

    fn relay_off(&mut self) -> Result<(), ActuatorError> {
        self.relay.turn_off()
    }

    fn is_relay_on(&self) -> bool {
        self.relay.is_on()
    }
}
