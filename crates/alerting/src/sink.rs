//! Alert device seam

use crate::{AlertChannel, AlertError};
use tracing::info;

/// A looping audio cue backed by some playback device.
///
/// Implementations are driven only by [`crate::AlertManager`]; an `Err` from
/// any call makes the manager treat the channel as inert from then on.
pub trait AlertSink: Send {
    /// Start looping playback from the current position
    fn start_loop(&mut self) -> Result<(), AlertError>;

    /// Pause playback and seek back to the start
    fn stop_and_rewind(&mut self) -> Result<(), AlertError>;

    /// Whether the cue is currently audible
    fn is_playing(&self) -> bool;

    /// Free the underlying device. Called once, at teardown.
    fn release(&mut self) {}
}

/// In-process sink that only logs its transitions.
///
/// Used by hosts without an audio device (replay, headless runs).
#[derive(Debug)]
pub struct TraceSink {
    channel: AlertChannel,
    playing: bool,
    starts: u32,
}

impl TraceSink {
    pub fn new(channel: AlertChannel) -> Self {
        Self {
            channel,
            playing: false,
            starts: 0,
        }
    }

    /// Number of times playback was actually started
    pub fn starts(&self) -> u32 {
        self.starts
    }
}

impl AlertSink for TraceSink {
    fn start_loop(&mut self) -> Result<(), AlertError> {
        self.playing = true;
        self.starts += 1;
        info!(channel = %self.channel, "Alert loop started");
        Ok(())
    }

    fn stop_and_rewind(&mut self) -> Result<(), AlertError> {
        if self.playing {
            info!(channel = %self.channel, "Alert loop stopped");
        }
        self.playing = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn release(&mut self) {
        self.playing = false;
    }
}
