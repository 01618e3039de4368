//! Non-blocking indicator LED flash.
//!
//! `flash()` lights the LED and `tick()` turns it off once the duration
//! has passed, so the hardware loop never sleeps just to blink.

use embedded_hal::digital::OutputPin;
use log::warn;

pub const DEFAULT_FLASH_MS: u32 = 500;

pub struct Indicator<P> {
    pin: P,
    lit_since_ms: Option<u32>,
    flash_ms: u32,
    write_failures: u32,
}

impl<P: OutputPin> Indicator<P> {
    pub fn new(pin: P, flash_ms: u32) -> Self {
        let mut led = Self {
            pin,
            lit_since_ms: None,
            flash_ms,
            write_failures: 0,
        };
        if led.pin.set_low().is_err() {
            led.write_failed("set_low");
        }
        led
    }

    /// Light the LED (restarts the timer if already lit).
    pub fn flash(&mut self, now_ms: u32) {
        if self.pin.set_high().is_ok() {
            self.lit_since_ms = Some(now_ms);
        } else {
            self.write_failed("set_high");
        }
    }

    /// Call once per hardware-loop iteration.  A failed turn-off is
    /// retried on the next call.
    pub fn tick(&mut self, now_ms: u32) {
        if let Some(since) = self.lit_since_ms {
            if now_ms.wrapping_sub(since) >= self.flash_ms {
                if self.pin.set_low().is_ok() {
                    self.lit_since_ms = None;
                } else {
                    self.write_failed("set_low");
                }
            }
        }
    }

    /// GPIO writes that failed since construction.
    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    fn write_failed(&mut self, op: &str) {
        self.write_failures = self.write_failures.wrapping_add(1);
        warn!("indicator: GPIO {} failed", op);
    }

    pub fn is_lit(&self) -> bool {
        self.lit_since_ms.is_some()
    }
}
