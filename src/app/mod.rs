//! Application core — pure domain logic, zero I/O.
//!
//! Relay command handling and the telemetry cadence around the metering
//! pipeline.  All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
