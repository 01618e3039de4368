//! Fuzz target: serial and MQTT-topic command parsers
//!
//! Feeds arbitrary UTF-8 to `PlugCommand::parse_serial` and, split at the
//! first NUL into (topic, filter), to `PlugCommand::from_topic`, checking:
//! - No panics on any input
//! - A topic is only accepted when it matches its filter
//! - An accepted topic ends in one of the two relay suffixes
//!
//! cargo fuzz run fuzz_command_parsers

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartplug::adapters::mqtt::topic_matches;
use smartplug::app::commands::{PlugCommand, TOPIC_RELAY_OFF, TOPIC_RELAY_ON};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let _ = PlugCommand::parse_serial(text);

    let (topic, filter) = text.split_once('\0').unwrap_or((text, "#"));
    if let Some(cmd) = PlugCommand::from_topic(topic, filter) {
        assert!(topic_matches(topic, filter), "accepted non-matching topic");
        let suffix = match cmd {
            PlugCommand::RelayOn => TOPIC_RELAY_ON,
            PlugCommand::RelayOff => TOPIC_RELAY_OFF,
            PlugCommand::RelayStatus => panic!("topics never map to a status query"),
        };
        assert!(topic.ends_with(suffix));
    }
});
