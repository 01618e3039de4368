//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below exercises one subsystem against the mock adapters in
//! `mock_hw`.  Everything runs on the host with no hardware attached.

mod metering_tests;
mod mock_hw;
mod service_tests;
