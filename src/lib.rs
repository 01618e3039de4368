//! SmartPlug firmware library.
//!
//! Pulse-frequency energy metering, relay control and MQTT telemetry for
//! an HLW8012-based smart plug.  Everything outside `main.rs` builds on
//! the host; ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod channels;
pub mod config;
pub mod drivers;
pub mod error;
pub mod metering;
pub mod pins;

#[cfg(target_os = "espidf")]
mod esp_link_shims;
