//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (MQTT, serial
//! console) that the [`PlugService`](super::service::PlugService)
//! interprets and acts upon.

use core::fmt;

/// Suffix (after the device prefix) that switches the load on.
pub const TOPIC_RELAY_ON: &str = "cmd/relay/on";
/// Suffix (after the device prefix) that switches the load off.
pub const TOPIC_RELAY_OFF: &str = "cmd/relay/off";

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlugCommand {
    /// Energise the relay.
    RelayOn,
    /// De-energise the relay.
    RelayOff,
    /// Report the current relay state.
    RelayStatus,
}

/// A serial line that is not a recognised command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    Unknown,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "invalid command, use: ON, OFF, 1, 0, or STATUS"),
        }
    }
}

impl PlugCommand {
    /// Parse one serial console line.
    ///
    /// Case-insensitive and whitespace-trimmed.  An empty line is not an
    /// error, just nothing to do.
    pub fn parse_serial(line: &str) -> Result<Option<Self>, CommandError> {
        let cmd = line.trim();
        if cmd.is_empty() {
            return Ok(None);
        }
        if cmd.eq_ignore_ascii_case("ON") || cmd == "1" {
            Ok(Some(Self::RelayOn))
        } else if cmd.eq_ignore_ascii_case("OFF") || cmd == "0" {
            Ok(Some(Self::RelayOff))
        } else if cmd.eq_ignore_ascii_case("STATUS") {
            Ok(Some(Self::RelayStatus))
        } else {
            Err(CommandError::Unknown)
        }
    }

    /// Map an inbound MQTT topic to a command.
    ///
    /// `topic` must fall under `subscribe_filter` (e.g. `plug-01/#`); the
    /// remainder after the first `/` selects the action.  Anything else is
    /// ignored.
    pub fn from_topic(topic: &str, subscribe_filter: &str) -> Option<Self> {
        if !crate::adapters::mqtt::topic_matches(topic, subscribe_filter) {
            return None;
        }
        let (_, suffix) = topic.split_once('/')?;
        match suffix {
            TOPIC_RELAY_ON => Some(Self::RelayOn),
            TOPIC_RELAY_OFF => Some(Self::RelayOff),
            _ => None,
        }
    }
}
