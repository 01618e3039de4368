//! Mock hardware for integration tests.
//!
//! A settable clock, a relay that records every call, GPIO pins backed by
//! shared cells, and an event sink that keeps everything it is given.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};
use smartplug::app::events::AppEvent;
use smartplug::app::ports::{ClockPort, EventSink, RelayPort};
use smartplug::error::ActuatorError;

// ── MockClock ─────────────────────────────────────────────────

/// Boot-relative clock; µs and ms views stay consistent.
pub struct MockClock {
    us: Cell<u64>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self { us: Cell::new(0) }
    }

    pub fn at_us(us: u64) -> Self {
        Self { us: Cell::new(us) }
    }

    pub fn total_us(&self) -> u64 {
        self.us.get()
    }

    pub fn advance_us(&self, us: u64) {
        self.us.set(self.us.get() + us);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1_000);
    }
}

impl ClockPort for MockClock {
    fn now_us(&self) -> u32 {
        self.us.get() as u32
    }

    fn now_ms(&self) -> u32 {
        (self.us.get() / 1_000) as u32
    }
}

// ── MockRelay ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCall {
    On,
    Off,
}

pub struct MockRelay {
    pub calls: Vec<RelayCall>,
    pub on: bool,
    /// When set, every write fails and state is left unchanged.
    pub broken: bool,
}

#[allow(dead_code)]
impl MockRelay {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            on: false,
            broken: false,
        }
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::new()
        }
    }
}

impl RelayPort for MockRelay {
    fn relay_on(&mut self) -> Result<(), ActuatorError> {
        self.calls.push(RelayCall::On);
        if self.broken {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.on = true;
        Ok(())
    }

    fn relay_off(&mut self) -> Result<(), ActuatorError> {
        self.calls.push(RelayCall::Off);
        if self.broken {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.on = false;
        Ok(())
    }

    fn is_relay_on(&self) -> bool {
        self.on
    }
}

// ── MockPin ───────────────────────────────────────────────────

/// Output pin whose level the test can observe after handing it off.
#[derive(Clone)]
pub struct MockPin {
    level: Rc<Cell<bool>>,
}

#[allow(dead_code)]
impl MockPin {
    pub fn new() -> Self {
        Self {
            level: Rc::new(Cell::new(false)),
        }
    }

    pub fn is_high(&self) -> bool {
        self.level.get()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.set(true);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn telemetry_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Telemetry(_)))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
