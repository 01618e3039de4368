//! Fuzz target: `.env` credentials parser
//!
//! Any input must either be rejected with an `EnvError` or produce a
//! `DeviceEnv` that passes its own validation.
//!
//! cargo fuzz run fuzz_device_env

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartplug::adapters::env::DeviceEnv;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Ok(env) = DeviceEnv::parse(&text) {
        assert!(env.validate().is_ok());
        assert!(!env.ssid.is_empty());
        assert!(!env.cid.is_empty());
    }
});
