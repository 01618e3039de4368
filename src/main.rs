//! SmartPlug firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ PRO core                          │ APP core                 │
//! │                                   │                          │
//! │  main: WiFi + MQTT publish loop   │  hw-loop:                │
//! │  mqtt-rx: connection poll ──┐     │    drain COMMAND_CHANNEL │
//! │  console: serial commands ──┼──▶ COMMAND_CHANNEL             │
//! │                             │     │    PlugService::tick     │
//! │  publish ◀── TELEMETRY_CHANNEL ◀──│    (Meter, relay, LED)   │
//! └──────────────────────────────────────────────────────────────┘
//!            ▲ CF / CF1 GPIO ISRs → PulseChannel statics
//! ```

#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{AnyOutputPin, PinDriver};
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::mqtt::client::{EspMqttConnection, EventPayload};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use smartplug::adapters::env::DeviceEnv;
use smartplug::adapters::hardware::HardwareAdapter;
use smartplug::adapters::log_sink::LogEventSink;
use smartplug::adapters::mqtt::{self, ChannelTelemetrySink, TelemetryOutbox};
use smartplug::adapters::time::Esp32TimeAdapter;
use smartplug::adapters::wifi::WifiLink;
use smartplug::app::commands::PlugCommand;
use smartplug::app::ports::ClockPort;
use smartplug::app::service::PlugService;
use smartplug::channels::{self, COMMAND_CHANNEL, TELEMETRY_CHANNEL};
use smartplug::config::PlugConfig;
use smartplug::drivers::indicator::{DEFAULT_FLASH_MS, Indicator};
use smartplug::drivers::relay::RelayDriver;
use smartplug::drivers::task_pin::{Core, TaskSpec, spawn_on_core};
use smartplug::{metering, pins};

const DEVICE_ENV: &str = include_str!(concat!(env!("OUT_DIR"), "/device.env"));

/// Set by the MQTT poll thread; the publish loop resubscribes on each
/// false → true transition.
static MQTT_UP: AtomicBool = AtomicBool::new(false);

const HW_TASK: TaskSpec = TaskSpec {
    core: Core::App,
    priority: 10,
    stack_kb: 8,
    name: "hw-loop\0",
};

const MQTT_RX_TASK: TaskSpec = TaskSpec {
    core: Core::Pro,
    priority: 5,
    stack_kb: 8,
    name: "mqtt-rx\0",
};

const CONSOLE_TASK: TaskSpec = TaskSpec {
    core: Core::Pro,
    priority: 3,
    stack_kb: 4,
    name: "console\0",
};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("SmartPlug v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = PlugConfig::default();
    config.validate().map_err(|e| anyhow!("config: {e}"))?;
    let env = DeviceEnv::parse(DEVICE_ENV).map_err(|e| anyhow!("device env: {e}"))?;
    info!("Device '{}', broker {}:{}", env.cid, env.mqtt, config.mqtt_port);

    let peripherals = Peripherals::take().context("Peripherals::take")?;
    let sysloop = EspSystemEventLoop::take().context("event loop")?;
    let nvs = EspDefaultNvsPartition::take().context("nvs partition")?;

    // ── 3. Metering (ISR wiring + meter) ──────────────────────
    // SAFETY: esp_random reads the hardware RNG register.
    let seed = u64::from(unsafe { esp_idf_svc::sys::esp_random() });
    let meter = metering::initialize(&config, pins::METER_CF_GPIO, pins::METER_CF1_GPIO, seed)
        .map_err(|e| anyhow!("metering init: {e}"))?;

    // ── 4. Relay + indicator ──────────────────────────────────
    // SAFETY: neither GPIO is taken from `peripherals.pins` anywhere else.
    let (relay_gpio, led_gpio) = unsafe {
        (
            AnyOutputPin::new(pins::RELAY_GPIO),
            AnyOutputPin::new(pins::LED_EXTERNAL_GPIO),
        )
    };
    let relay_pin = PinDriver::output(relay_gpio).context("relay pin")?;
    let led_pin = PinDriver::output(led_gpio).context("led pin")?;
    let relay = RelayDriver::new(relay_pin).map_err(|e| anyhow!("relay: {e}"))?;
    let hw = HardwareAdapter::new(relay, Indicator::new(led_pin, DEFAULT_FLASH_MS));

    // ── 5. Hardware task (APP core) ───────────────────────────
    let hw_config = config.clone();
    spawn_on_core(HW_TASK, move || hardware_loop(hw_config, meter, hw))
        .context("spawn hardware task")?;

    // ── 6. Serial console ─────────────────────────────────────
    spawn_on_core(CONSOLE_TASK, console_loop).context("spawn console task")?;

    // ── 7. Network ────────────────────────────────────────────
    let mut wifi = WifiLink::connect(peripherals.modem, sysloop, nvs, &env)
        .map_err(|e| anyhow!("wifi: {e}"))?;
    let (mut session, conn) =
        mqtt::connect(&env, config.mqtt_port).map_err(|e| anyhow!("mqtt: {e}"))?;

    let filter = env.sub.clone();
    spawn_on_core(MQTT_RX_TASK, move || mqtt_rx_loop(conn, &filter))
        .context("spawn mqtt task")?;

    // ── 8. Publish loop (this task, PRO core) ─────────────────
    info!("System ready.");
    let poll = Duration::from_millis(u64::from(config.messaging_poll_interval_ms));
    let mut subscribed = false;
    let mut outbox = TelemetryOutbox::new();

    loop {
        if let Err(wait_secs) = wifi.ensure_connected() {
            warn!("wifi: retry in {} s", wait_secs);
            std::thread::sleep(Duration::from_secs(u64::from(wait_secs)));
            continue;
        }

        let up = MQTT_UP.load(Ordering::Acquire);
        if up && !subscribed {
            subscribed = session.subscribe(&env.sub).is_ok();
        } else if !up {
            subscribed = false;
        }

        // Offline: reports stay queued until the broker is back.
        match outbox.flush(&TELEMETRY_CHANNEL, &mut session, &env.cid, up) {
            Ok(0) => {}
            Ok(sent) => info!("mqtt: {} report(s) published ({} total)", sent, outbox.published()),
            Err(e) => warn!("mqtt: {}, will retry", e),
        }

        std::thread::sleep(poll);
    }
}

/// Metering, relay commands and the telemetry cadence.
fn hardware_loop<S, R, L>(config: PlugConfig, meter: metering::Meter<S>, mut hw: HardwareAdapter<R, L>)
where
    S: metering::source::ReadingSource,
    R: embedded_hal::digital::OutputPin,
    L: embedded_hal::digital::OutputPin,
{
    let clock = Esp32TimeAdapter::new();
    let mut sink = (LogEventSink::new(), ChannelTelemetrySink::new(&TELEMETRY_CHANNEL));
    let mut service = PlugService::with_meter(config, meter);
    let interval = Duration::from_millis(u64::from(service.config().hardware_loop_interval_ms));

    service.start(&hw, &mut sink);

    loop {
        let now_ms = clock.now_ms();
        channels::drain_commands(&COMMAND_CHANNEL, |cmd| {
            hw.acknowledge(now_ms);
            service.handle_command(cmd, &mut hw, &mut sink);
        });

        service.tick(&clock, &hw, &mut sink);
        hw.poll(now_ms);

        std::thread::sleep(interval);
    }
}

/// Relay commands typed on the UART console.
fn console_loop() {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("console: read failed: {}", e);
                std::thread::sleep(Duration::from_millis(100));
                continue;
            }
        };
        match PlugCommand::parse_serial(&line) {
            Ok(Some(cmd)) => {
                let _ = channels::submit_command(&COMMAND_CHANNEL, cmd);
            }
            Ok(None) => {}
            Err(e) => println!("{e}"),
        }
    }
    error!("console: stdin closed");
}

/// Drives the MQTT client and routes inbound topics to commands.
fn mqtt_rx_loop(mut conn: EspMqttConnection, filter: &str) {
    loop {
        match conn.next() {
            Ok(event) => match event.payload() {
                EventPayload::Connected(_) => {
                    info!("mqtt: connected");
                    MQTT_UP.store(true, Ordering::Release);
                }
                EventPayload::Disconnected => {
                    warn!("mqtt: disconnected");
                    MQTT_UP.store(false, Ordering::Release);
                }
                EventPayload::Received {
                    topic: Some(topic), ..
                } => match PlugCommand::from_topic(topic, filter) {
                    Some(cmd) => {
                        info!("mqtt: {} -> {:?}", topic, cmd);
                        let _ = channels::submit_command(&COMMAND_CHANNEL, cmd);
                    }
                    None => info!("mqtt: ignoring {}", topic),
                },
                _ => {}
            },
            Err(e) => {
                warn!("mqtt: poll error: {:?}", e);
                MQTT_UP.store(false, Ordering::Release);
                std::thread::sleep(Duration::from_secs(2));
            }
        }
    }
}
