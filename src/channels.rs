//! Inter-task channels.
//!
//! Bounded `embassy-sync` channels bridging the messaging task (WiFi,
//! MQTT, serial console) and the hardware task (metering, relay).  Both
//! sides only use `try_send` / `try_receive`, so neither ever blocks on
//! the other.
//!
//! ```text
//! ┌────────────────┐  PlugCommand    ┌───────────────┐
//! │ Messaging Task │───────────────▶│ Hardware Task │
//! │  (PRO core)    │◀───────────────│  (APP core)   │
//! └────────────────┘  TelemetryData  └───────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::PlugCommand;
use crate::app::events::TelemetryData;
use crate::error::CommsError;

/// Depth of the inbound command queue.
pub const COMMAND_DEPTH: usize = 8;

/// Depth of the outbound telemetry queue.
pub const TELEMETRY_DEPTH: usize = 4;

pub type CommandChannel = Channel<CriticalSectionRawMutex, PlugCommand, COMMAND_DEPTH>;
pub type TelemetryChannel = Channel<CriticalSectionRawMutex, TelemetryData, TELEMETRY_DEPTH>;

/// Inbound commands: messaging task → hardware task.
pub static COMMAND_CHANNEL: CommandChannel = Channel::new();

/// Outbound reports: hardware task → messaging task.
pub static TELEMETRY_CHANNEL: TelemetryChannel = Channel::new();

/// Queue a command without blocking.
pub fn submit_command(channel: &CommandChannel, cmd: PlugCommand) -> Result<(), CommsError> {
    channel.try_send(cmd).map_err(|_| {
        warn!("command queue full, dropping {:?}", cmd);
        CommsError::ChannelFull
    })
}

/// Hand every queued command to `f`, oldest first.  Returns how many ran.
pub fn drain_commands(channel: &CommandChannel, mut f: impl FnMut(PlugCommand)) -> usize {
    let mut n = 0;
    while let Ok(cmd) = channel.try_receive() {
        f(cmd);
        n += 1;
    }
    n
}
