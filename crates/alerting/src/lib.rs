//! Alerting System
//!
//! Owns the two looping alert channels (Mild, Severe) and executes the
//! start/stop commands issued by the drowsiness monitor. A channel whose
//! device cannot be opened, or fails mid-playback, turns inert instead of
//! failing the caller.

mod channel;
mod manager;
mod sink;

pub use channel::{AlertChannel, AlertCommand, ChannelStatus};
pub use manager::{AlertManager, ChannelHealth};
pub use sink::{AlertSink, TraceSink};

use thiserror::Error;

/// Alert device errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    #[error("{channel} alert device unavailable: {reason}")]
    DeviceUnavailable {
        channel: AlertChannel,
        reason: String,
    },

    #[error("{channel} alert playback failed: {reason}")]
    Playback {
        channel: AlertChannel,
        reason: String,
    },
}
