//! Alert channel vocabulary shared by the monitor and the executor

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical looping alert cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    /// Warning played after a few seconds of closed eyes
    Mild,
    /// Escalated alarm; silences Mild while it plays
    Severe,
}

impl AlertChannel {
    pub const ALL: [AlertChannel; 2] = [AlertChannel::Mild, AlertChannel::Severe];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Severe => "severe",
        }
    }
}

impl fmt::Display for AlertChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command issued to the alert executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "channel", rename_all = "snake_case")]
pub enum AlertCommand {
    /// Start the channel looping (no-op if already playing)
    Start(AlertChannel),
    /// Stop the channel and rewind it to the beginning
    StopAndRewind(AlertChannel),
}

impl AlertCommand {
    pub fn channel(&self) -> AlertChannel {
        match *self {
            Self::Start(channel) | Self::StopAndRewind(channel) => channel,
        }
    }
}

/// Snapshot of which channels can play and which are playing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub mild_playing: bool,
    pub severe_playing: bool,
    /// Mild device is open and accepting commands
    pub mild_ready: bool,
    /// Severe device is open and accepting commands
    pub severe_ready: bool,
}

impl ChannelStatus {
    /// Both channels ready, neither playing
    pub fn idle() -> Self {
        Self {
            mild_ready: true,
            severe_ready: true,
            ..Default::default()
        }
    }

    pub fn is_ready(&self, channel: AlertChannel) -> bool {
        match channel {
            AlertChannel::Mild => self.mild_ready,
            AlertChannel::Severe => self.severe_ready,
        }
    }

    pub fn is_playing(&self, channel: AlertChannel) -> bool {
        match channel {
            AlertChannel::Mild => self.mild_playing,
            AlertChannel::Severe => self.severe_playing,
        }
    }
}
