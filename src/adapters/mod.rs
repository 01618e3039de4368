//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                   |
//! |-------------|--------------------|-------------------------------|
//! | `hardware`  | RelayPort          | Relay + indicator GPIO        |
//! | `log_sink`  | EventSink          | Serial log output             |
//! | `mqtt`      | EventSink          | Outbound telemetry queue      |
//! | `time`      | ClockPort          | ESP32 high-resolution timer   |
//! | `env`       | (credentials)      | `.env`-style text             |
//! | `wifi`      | (device only)      | ESP-IDF WiFi STA              |

pub mod env;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub(crate) mod utils;
#[cfg(target_os = "espidf")]
pub mod wifi;
