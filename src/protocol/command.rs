//! Commands sent from the host to the device.
//!
//! The firmware reads slash-prefixed commands terminated by a NUL byte.

use chrono::{DateTime, TimeZone};

/// Command asking the device to print its `I` line
pub const CMD_INFO: &str = "info";

/// Command carrying the host's wall clock in milliseconds since the Unix epoch
pub const CMD_SYNC_CLOCK: &str = "sync_clock";

/// Human readable timestamp sent along with the connect handshake
pub const HANDSHAKE_TIME_FORMAT: &str = "%Y.%m.%d %H:%M:%S%.3f";

/// A command for the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Request sensor info
    Info,
    /// Synchronise the device clock
    SyncClock { epoch_ms: i64 },
    /// Free text typed by the user, sent without the leading slash
    Raw(String),
}

impl HostCommand {
    /// Wire encoding of the command, `None` for an empty raw command
    pub fn encode(&self) -> Option<Vec<u8>> {
        let text = match self {
            HostCommand::Info => format!("/{}\0", CMD_INFO),
            HostCommand::SyncClock { epoch_ms } => format!("/{} {}\0", CMD_SYNC_CLOCK, epoch_ms),
            HostCommand::Raw(text) if text.is_empty() => return None,
            HostCommand::Raw(text) => format!("/{}\0", text),
        };
        Some(text.into_bytes())
    }

    /// Whether the command should be echoed back to the user once sent
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, HostCommand::SyncClock { .. })
    }
}

impl std::fmt::Display for HostCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostCommand::Info => write!(f, "/{}", CMD_INFO),
            HostCommand::SyncClock { epoch_ms } => write!(f, "/{} {}", CMD_SYNC_CLOCK, epoch_ms),
            HostCommand::Raw(text) => write!(f, "/{}", text),
        }
    }
}

/// Message sent right after connecting: request info, sync the clock and
/// give the device a readable timestamp for its record file header.
pub fn handshake<Tz>(now: &DateTime<Tz>) -> Vec<u8>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "/{}\n/{} {}\n{}\0",
        CMD_INFO,
        CMD_SYNC_CLOCK,
        now.timestamp_millis(),
        now.format(HANDSHAKE_TIME_FORMAT)
    )
    .into_bytes()
}
