//! MQTT adapter helpers.
//!
//! Topic filtering, telemetry payload encoding, the [`EventSink`] that
//! hands telemetry from the hardware task to the messaging task, and the
//! [`TelemetryOutbox`] that drains it towards the broker.
//! The broker session itself (ESP-IDF MQTT client) is only built on
//! device; everything else here is pure and host-tested.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, warn};
use serde::Serialize;

use crate::app::events::{AppEvent, TelemetryData};
use crate::app::ports::EventSink;
use crate::error::{CommsError, Result};

/// Default broker port.
pub const DEFAULT_PORT: u16 = 1883;

// ── Topic matching ────────────────────────────────────────────

/// Does `topic` fall under the subscription `filter`?
///
/// Only the trailing multi-level wildcard is honoured: `plug/#` matches
/// anything starting with `plug/`.  A filter without `#` must match
/// exactly.  `+` is not interpreted.
pub fn topic_matches(topic: &str, filter: &str) -> bool {
    match filter.strip_suffix('#') {
        Some(prefix) => topic.starts_with(prefix),
        None => topic == filter,
    }
}

/// `mqtt://host:port`.
pub fn broker_url(host: &str, port: u16) -> String {
    format!("mqtt://{host}:{port}")
}

// ── Telemetry payload ─────────────────────────────────────────

/// JSON body published on the telemetry topic.
#[derive(Debug, Serialize)]
pub struct TelemetryPayload<'a> {
    #[serde(rename = "energyIncrement")]
    pub energy_increment: f64,
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
    #[serde(rename = "deviceName")]
    pub device_name: &'a str,
}

impl<'a> TelemetryPayload<'a> {
    pub fn new(data: &TelemetryData, device_name: &'a str) -> Self {
        Self {
            energy_increment: data.energy_increment_kwh,
            voltage: data.voltage,
            current: data.current_a,
            power: data.power_w,
            device_name,
        }
    }
}

/// Serialise one report for publishing.
pub fn encode_telemetry(
    data: &TelemetryData,
    device_name: &str,
) -> core::result::Result<Vec<u8>, CommsError> {
    serde_json::to_vec(&TelemetryPayload::new(data, device_name))
        .map_err(|_| CommsError::PayloadEncodeFailed)
}

// ── Outbound queue sink ───────────────────────────────────────

/// Forwards [`AppEvent::Telemetry`] into a bounded channel; every other
/// event is ignored.  Never blocks: a full queue drops the report.
pub struct ChannelTelemetrySink<'a, const N: usize> {
    channel: &'a Channel<CriticalSectionRawMutex, TelemetryData, N>,
    dropped: u32,
}

impl<'a, const N: usize> ChannelTelemetrySink<'a, N> {
    pub fn new(channel: &'a Channel<CriticalSectionRawMutex, TelemetryData, N>) -> Self {
        Self { channel, dropped: 0 }
    }

    /// Reports lost to a full queue since construction.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize> EventSink for ChannelTelemetrySink<'_, N> {
    fn emit(&mut self, event: &AppEvent) {
        if let AppEvent::Telemetry(data) = event {
            if self.channel.try_send(*data).is_err() {
                self.dropped = self.dropped.wrapping_add(1);
                warn!("mqtt: telemetry queue full, report dropped ({} total)", self.dropped);
            }
        }
    }
}

// ── Outbound drain ────────────────────────────────────────────

/// Where encoded telemetry goes; the broker session on device.
pub trait TelemetryLink {
    fn publish(&mut self, payload: &[u8]) -> core::result::Result<(), CommsError>;
}

/// Drains the telemetry queue into a [`TelemetryLink`] without losing
/// reports to a dead link.
///
/// Every report carries energy the meter has already reset, so a report
/// leaves the queue only once it has been published.  While offline the
/// queue is left alone and fills up; a report whose publish fails is held
/// here and goes out first on the next flush.
#[derive(Debug, Default)]
pub struct TelemetryOutbox {
    held: Option<TelemetryData>,
    published: u32,
}

impl TelemetryOutbox {
    pub const fn new() -> Self {
        Self {
            held: None,
            published: 0,
        }
    }

    /// Report waiting for a retry, if any.
    pub fn held(&self) -> Option<&TelemetryData> {
        self.held.as_ref()
    }

    /// Reports published since construction.
    pub fn published(&self) -> u32 {
        self.published
    }

    /// Publish queued reports in order.  Returns how many went out.
    ///
    /// Does nothing while `online` is false.  Stops at the first publish
    /// failure and returns it; that report is kept for the next call.
    /// A report that cannot be encoded is logged and dropped.
    pub fn flush<const N: usize>(
        &mut self,
        queue: &Channel<CriticalSectionRawMutex, TelemetryData, N>,
        link: &mut impl TelemetryLink,
        device_name: &str,
        online: bool,
    ) -> Result<usize> {
        if !online {
            return Ok(0);
        }

        let mut sent = 0;
        loop {
            let report = match self.held.take() {
                Some(report) => report,
                None => match queue.try_receive() {
                    Ok(report) => report,
                    Err(_) => return Ok(sent),
                },
            };

            let payload = match encode_telemetry(&report, device_name) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("mqtt: {}, report dropped", e);
                    continue;
                }
            };

            if let Err(e) = link.publish(&payload) {
                debug!("mqtt: holding report for retry");
                self.held = Some(report);
                return Err(e.into());
            }
            sent += 1;
            self.published = self.published.wrapping_add(1);
        }
    }
}

// ── Broker session (device only) ──────────────────────────────

#[cfg(target_os = "espidf")]
pub use session::{MqttSession, connect};

#[cfg(target_os = "espidf")]
mod session {
    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EspMqttConnection, MqttClientConfiguration, QoS,
    };
    use log::{info, warn};

    use super::{TelemetryLink, broker_url};
    use crate::adapters::env::DeviceEnv;
    use crate::error::{CommsError, Result};

    /// Connected client; the paired [`EspMqttConnection`] must be polled
    /// on its own thread for the session to make progress.
    pub struct MqttSession {
        client: EspMqttClient<'static>,
        publish_topic: String,
    }

    fn non_empty(s: &str) -> Option<&str> {
        if s.is_empty() { None } else { Some(s) }
    }

    /// Open a session to the broker named in `env` and subscribe to its
    /// command filter.
    pub fn connect(
        env: &DeviceEnv,
        port: u16,
    ) -> Result<(MqttSession, EspMqttConnection)> {
        let url = broker_url(&env.mqtt, port);
        let conf = MqttClientConfiguration {
            client_id: Some(env.cid.as_str()),
            username: non_empty(&env.cuser),
            password: non_empty(&env.cpass),
            ..Default::default()
        };

        let (client, conn) = EspMqttClient::new(&url, &conf).map_err(|e| {
            warn!("mqtt: connect to {} failed: {:?}", url, e);
            CommsError::MqttConnectFailed
        })?;
        info!("mqtt: client created for {} as '{}'", url, env.cid);

        Ok((
            MqttSession {
                client,
                publish_topic: env.publish.as_str().into(),
            },
            conn,
        ))
    }

    impl MqttSession {
        pub fn subscribe(&mut self, filter: &str) -> Result<()> {
            self.client
                .subscribe(filter, QoS::AtMostOnce)
                .map(|_| info!("mqtt: subscribed to {}", filter))
                .map_err(|e| {
                    warn!("mqtt: subscribe {} failed: {:?}", filter, e);
                    CommsError::MqttConnectFailed.into()
                })
        }
    }

    impl TelemetryLink for MqttSession {
        fn publish(&mut self, payload: &[u8]) -> core::result::Result<(), CommsError> {
            self.client
                .publish(&self.publish_topic, QoS::AtMostOnce, false, payload)
                .map(|_| ())
                .map_err(|e| {
                    warn!("mqtt: publish failed: {:?}", e);
                    CommsError::MqttPublishFailed
                })
        }
    }
}
