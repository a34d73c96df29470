//! Alert Manager Implementation

use crate::{AlertChannel, AlertCommand, AlertError, AlertSink, ChannelStatus};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Health of a single alert channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChannelHealth {
    /// Device open and accepting commands
    Ready,
    /// Device failed; commands are ignored for the rest of the session
    Inert { reason: String },
    /// Released at teardown
    Released,
}

enum Slot {
    Ready(Box<dyn AlertSink>),
    Inert(String),
    Released,
}

impl Slot {
    fn open(channel: AlertChannel, sink: Result<Box<dyn AlertSink>, AlertError>) -> Self {
        match sink {
            Ok(sink) => {
                debug!(%channel, "Alert channel ready");
                Slot::Ready(sink)
            }
            Err(e) => {
                warn!(%channel, error = %e, "Alert channel unavailable, running without it");
                Slot::Inert(e.to_string())
            }
        }
    }

    fn is_playing(&self) -> bool {
        match self {
            Slot::Ready(sink) => sink.is_playing(),
            Slot::Inert(_) | Slot::Released => false,
        }
    }
}

/// Executes alert commands against the Mild and Severe channels.
///
/// Start is idempotent: a channel that reports playing is never started
/// again. Stop only touches a channel that is playing.
pub struct AlertManager {
    mild: Slot,
    severe: Slot,
}

impl AlertManager {
    /// Create a manager from the result of opening each channel's device
    pub fn new(
        mild: Result<Box<dyn AlertSink>, AlertError>,
        severe: Result<Box<dyn AlertSink>, AlertError>,
    ) -> Self {
        Self {
            mild: Slot::open(AlertChannel::Mild, mild),
            severe: Slot::open(AlertChannel::Severe, severe),
        }
    }

    /// Manager whose channels are both inert
    pub fn silent(reason: &str) -> Self {
        let unavailable = |channel| -> Result<Box<dyn AlertSink>, AlertError> {
            Err(AlertError::DeviceUnavailable {
                channel,
                reason: reason.to_string(),
            })
        };
        Self::new(
            unavailable(AlertChannel::Mild),
            unavailable(AlertChannel::Severe),
        )
    }

    /// Execute commands in order.
    ///
    /// If a start fails, channels silenced earlier in the same batch are
    /// started again, so a failed Severe device leaves Mild audible.
    pub fn execute(&mut self, commands: &[AlertCommand]) {
        let mut silenced = Vec::new();
        for command in commands {
            match *command {
                AlertCommand::Start(channel) => {
                    if !self.start(channel) {
                        for &fallback in &silenced {
                            warn!(failed = %channel, %fallback, "Falling back to silenced alert");
                            self.start(fallback);
                        }
                    }
                }
                AlertCommand::StopAndRewind(channel) => {
                    if self.stop_and_rewind(channel) {
                        silenced.push(channel);
                    }
                }
            }
        }
    }

    /// Returns false if the channel could not play
    fn start(&mut self, channel: AlertChannel) -> bool {
        let result = match self.slot_mut(channel) {
            Slot::Ready(sink) => {
                if sink.is_playing() {
                    debug!(%channel, "Alert already playing");
                    return true;
                }
                sink.start_loop()
            }
            Slot::Inert(_) | Slot::Released => return false,
        };

        match result {
            Ok(()) => {
                info!(%channel, "Alert started");
                counter!("dms_alert_starts_total", "channel" => channel.as_str()).increment(1);
                true
            }
            Err(e) => {
                self.disable(channel, e);
                false
            }
        }
    }

    /// Returns true if a playing channel was stopped
    fn stop_and_rewind(&mut self, channel: AlertChannel) -> bool {
        let result = match self.slot_mut(channel) {
            Slot::Ready(sink) if sink.is_playing() => sink.stop_and_rewind(),
            _ => return false,
        };

        match result {
            Ok(()) => {
                debug!(%channel, "Alert stopped");
                true
            }
            Err(e) => {
                self.disable(channel, e);
                false
            }
        }
    }

    fn disable(&mut self, channel: AlertChannel, error: AlertError) {
        warn!(%channel, error = %error, "Alert channel failed, disabling it");
        counter!("dms_alert_channel_failures_total", "channel" => channel.as_str()).increment(1);

        let slot = self.slot_mut(channel);
        if let Slot::Ready(sink) = &mut *slot {
            sink.release();
        }
        *slot = Slot::Inert(error.to_string());
    }

    /// Which channels are currently playing
    pub fn status(&self) -> ChannelStatus {
        ChannelStatus {
            mild_playing: self.mild.is_playing(),
            severe_playing: self.severe.is_playing(),
            mild_ready: matches!(self.mild, Slot::Ready(_)),
            severe_ready: matches!(self.severe, Slot::Ready(_)),
        }
    }

    /// Health of one channel
    pub fn health(&self, channel: AlertChannel) -> ChannelHealth {
        match self.slot(channel) {
            Slot::Ready(_) => ChannelHealth::Ready,
            Slot::Inert(reason) => ChannelHealth::Inert {
                reason: reason.clone(),
            },
            Slot::Released => ChannelHealth::Released,
        }
    }

    /// Stop and free both channels. Later commands are ignored; an inert
    /// channel keeps its failure reason.
    pub fn release(&mut self) {
        for channel in AlertChannel::ALL {
            let slot = self.slot_mut(channel);
            if let Slot::Ready(sink) = &mut *slot {
                if sink.is_playing() {
                    if let Err(e) = sink.stop_and_rewind() {
                        warn!(%channel, error = %e, "Failed to stop alert during release");
                    }
                }
                sink.release();
                debug!(%channel, "Alert channel released");
                *slot = Slot::Released;
            }
        }
    }

    fn slot(&self, channel: AlertChannel) -> &Slot {
        match channel {
            AlertChannel::Mild => &self.mild,
            AlertChannel::Severe => &self.severe,
        }
    }

    fn slot_mut(&mut self, channel: AlertChannel) -> &mut Slot {
        match channel {
            AlertChannel::Mild => &mut self.mild,
            AlertChannel::Severe => &mut self.severe,
        }
    }
}
