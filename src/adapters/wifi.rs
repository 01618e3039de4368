//! WiFi station bring-up (device only).
//!
//! Credentials come pre-validated from [`DeviceEnv`].  Reconnection is
//! polled from the messaging task with [`ensure_connected`], which retries
//! with exponential backoff (2 s doubling, capped at 60 s).

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use super::env::DeviceEnv;
use crate::error::CommsError;

const MIN_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    backoff_secs: u32,
}

fn comms<E: core::fmt::Debug>(what: &'static str) -> impl FnOnce(E) -> CommsError {
    move |e| {
        warn!("wifi: {} failed: {:?}", what, e);
        CommsError::WifiConnectFailed
    }
}

impl WifiLink {
    /// Configure the station and block until the interface has an address.
    pub fn connect(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        env: &DeviceEnv,
    ) -> Result<Self, CommsError> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(comms("driver init"))?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(comms("wrap"))?;

        let auth_method = if env.pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let cfg = Configuration::Client(ClientConfiguration {
            ssid: env.ssid.as_str().try_into().map_err(comms("ssid"))?,
            password: env.pass.as_str().try_into().map_err(comms("password"))?,
            auth_method,
            ..Default::default()
        });
        wifi.set_configuration(&cfg).map_err(comms("set_configuration"))?;
        wifi.start().map_err(comms("start"))?;

        let mut link = Self {
            wifi,
            backoff_secs: MIN_BACKOFF_SECS,
        };
        link.join()?;
        Ok(link)
    }

    fn join(&mut self) -> Result<(), CommsError> {
        self.wifi.connect().map_err(comms("connect"))?;
        self.wifi.wait_netif_up().map_err(comms("wait_netif_up"))?;
        if let Ok(ip) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("wifi: connected, ip={}", ip.ip);
        }
        self.backoff_secs = MIN_BACKOFF_SECS;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    /// Rejoin if the link dropped.  On failure, returns how long to wait
    /// before the next attempt.
    pub fn ensure_connected(&mut self) -> Result<(), u32> {
        if self.is_connected() {
            return Ok(());
        }
        warn!("wifi: link down, reconnecting");
        self.join().map_err(|_| {
            let wait = self.backoff_secs;
            self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
            wait
        })
    }
}
