//! Device credentials from a `.env`-style text blob.
//!
//! ```text
//! # network
//! ssid=HomeNetwork
//! pass=hunter2hunter2
//! mqtt=10.0.0.2
//! cid=plug-01
//! cuser=
//! cpass=
//! sub=plug-01/#
//! pub=telemetry/plug-01
//! ```
//!
//! One `KEY=VALUE` per line.  Blank lines, `#` comments and lines without
//! `=` are skipped; keys and values are trimmed; unknown keys are ignored
//! and a repeated key overwrites the earlier value.

use core::fmt;

use heapless::String;
use log::{debug, warn};

use super::utils::is_printable_ascii;
use crate::app::ports::ConfigError;

const SSID_MAX: usize = 32;
const PASS_MIN: usize = 8;
const PASS_MAX: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvError {
    /// Value exceeds the fixed capacity for this key.
    TooLong(&'static str),
    /// A required key is missing or empty.
    Missing(&'static str),
    /// Value contains bytes outside printable ASCII.
    NotPrintable(&'static str),
    /// Length outside the valid range for this key.
    BadLength(&'static str),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong(k) => write!(f, "{k}: value too long"),
            Self::Missing(k) => write!(f, "{k}: missing"),
            Self::NotPrintable(k) => write!(f, "{k}: non-printable characters"),
            Self::BadLength(k) => write!(f, "{k}: invalid length"),
        }
    }
}

impl From<EnvError> for ConfigError {
    fn from(e: EnvError) -> Self {
        match e {
            EnvError::Missing(k) => Self::NotFound(k),
            EnvError::TooLong(k) | EnvError::NotPrintable(k) | EnvError::BadLength(k) => {
                Self::ValidationFailed(k)
            }
        }
    }
}

/// Network and broker credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceEnv {
    pub ssid: String<SSID_MAX>,
    pub pass: String<PASS_MAX>,
    /// Broker host.
    pub mqtt: String<64>,
    /// MQTT client id; also the `deviceName` in telemetry.
    pub cid: String<32>,
    pub cuser: String<32>,
    pub cpass: String<64>,
    /// Command subscription filter.
    pub sub: String<64>,
    /// Telemetry publish topic (`pub` in the file).
    pub publish: String<64>,
}

fn store<const N: usize>(
    slot: &mut String<N>,
    key: &'static str,
    value: &str,
) -> Result<(), EnvError> {
    slot.clear();
    slot.push_str(value).map_err(|()| EnvError::TooLong(key))
}

impl DeviceEnv {
    /// Parse `text` and validate the result.
    pub fn parse(text: &str) -> Result<Self, EnvError> {
        let mut env = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "ssid" => store(&mut env.ssid, "ssid", value)?,
                "pass" => store(&mut env.pass, "pass", value)?,
                "mqtt" => store(&mut env.mqtt, "mqtt", value)?,
                "cid" => store(&mut env.cid, "cid", value)?,
                "cuser" => store(&mut env.cuser, "cuser", value)?,
                "cpass" => store(&mut env.cpass, "cpass", value)?,
                "sub" => store(&mut env.sub, "sub", value)?,
                "pub" => store(&mut env.publish, "pub", value)?,
                other => debug!("env: ignoring unknown key '{}'", other),
            }
        }

        env.validate()?;
        Ok(env)
    }

    /// Check that every required value is present and well-formed.
    pub fn validate(&self) -> Result<(), EnvError> {
        if self.ssid.is_empty() {
            return Err(EnvError::Missing("ssid"));
        }
        if self.pass.is_empty() {
            warn!("env: no WiFi password, joining as open network");
        } else if self.pass.len() < PASS_MIN {
            return Err(EnvError::BadLength("pass"));
        }

        for (key, value) in [
            ("mqtt", self.mqtt.as_str()),
            ("cid", self.cid.as_str()),
            ("sub", self.sub.as_str()),
            ("pub", self.publish.as_str()),
        ] {
            if value.is_empty() {
                return Err(EnvError::Missing(key));
            }
        }

        for (key, value) in [
            ("ssid", self.ssid.as_str()),
            ("pass", self.pass.as_str()),
            ("mqtt", self.mqtt.as_str()),
            ("cid", self.cid.as_str()),
            ("cuser", self.cuser.as_str()),
            ("cpass", self.cpass.as_str()),
            ("sub", self.sub.as_str()),
            ("pub", self.publish.as_str()),
        ] {
            if !is_printable_ascii(value) {
                return Err(EnvError::NotPrintable(key));
            }
        }
        Ok(())
    }
}
