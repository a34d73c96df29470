//! Driver Monitoring System (DMS)
//!
//! Per-face eye-closure monitoring:
//! - Landmark position estimation across detector dropout
//! - Debounced closed-eye timing with two escalating alert levels
//! - Edge-triggered alert commands for the looping Mild/Severe channels

pub mod analysis;
pub mod clock;
pub mod config;
pub mod drowsiness;
pub mod frame;
pub mod landmarks;
pub mod state;

pub use analysis::{EyeMark, EyeOverlay, FrameAnalysis};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::DmsConfig;
pub use drowsiness::{plan_commands, transition, DrowsinessEvent, DrowsinessMonitor, EyeState, Step};
pub use frame::{EyeReading, FaceBbox, FaceFrame, Landmark, LandmarkId, Point};
pub use landmarks::{FixSource, LandmarkEstimator, LandmarkFix, NormalizedOffset};
pub use state::{AlertLevel, DrowsinessState};

use alerting::AlertManager;
use metrics::{counter, gauge};
use thiserror::Error;
use tracing::{debug, info};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Tracks one face across frames and drives its alerts.
///
/// Frames must be fed one at a time, in arrival order.
pub struct FaceTracker<C: Clock> {
    clock: C,
    landmarks: LandmarkEstimator,
    monitor: DrowsinessMonitor,
    alerts: AlertManager,
    face_id: Option<u32>,
    visible: bool,
}

impl<C: Clock> FaceTracker<C> {
    /// Create a tracker with configuration, time source and alert channels
    pub fn new(config: DmsConfig, clock: C, alerts: AlertManager) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            clock,
            landmarks: LandmarkEstimator::new(),
            monitor: DrowsinessMonitor::new(config),
            alerts,
            face_id: None,
            visible: false,
        })
    }

    /// A face has been picked up by the detector
    pub fn on_new_item(&mut self, face_id: u32) {
        info!(face_id, "Tracking new face");
        self.face_id = Some(face_id);
        self.visible = true;
    }

    /// Analyze a single frame for the tracked face
    pub fn on_update(&mut self, frame: &FaceFrame) -> FrameAnalysis {
        let now_ms = self.clock.now_ms();
        self.visible = true;
        counter!("dms_frames_total").increment(1);

        self.landmarks.observe(frame);
        let left = self.landmarks.position(frame, LandmarkId::LeftEye);
        let right = self.landmarks.position(frame, LandmarkId::RightEye);

        let step = self.monitor.step(frame.eyes, now_ms);
        if step.is_skipped() {
            counter!("dms_frames_skipped_total").increment(1);
        }
        gauge!("dms_eyes_closed_ms").set(step.closed_ms.unwrap_or(0) as f64);

        let commands = plan_commands(&step.events, self.alerts.status());
        if !commands.is_empty() {
            debug!(?commands, "Executing alert commands");
            self.alerts.execute(&commands);
        }

        FrameAnalysis {
            timestamp_ms: now_ms,
            eyes: step.eyes.map(|eyes| EyeOverlay {
                left: EyeMark {
                    position: left,
                    open: eyes.left_open,
                },
                right: EyeMark {
                    position: right,
                    open: eyes.right_open,
                },
            }),
            level: step.level,
            closed_ms: step.closed_ms,
            skipped: step.is_skipped(),
            events: step.events,
            commands,
        }
    }

    /// The face was not found in the latest frame. Timing state is kept.
    pub fn on_missing(&mut self) {
        debug!(face_id = ?self.face_id, "Face missing, hiding overlay");
        self.visible = false;
    }

    /// Tracking ended; stop and release both alert channels
    pub fn on_done(&mut self) {
        info!(face_id = ?self.face_id, "Face tracking done, releasing alerts");
        self.visible = false;
        self.alerts.release();
    }

    /// Whether the overlay for this face should be drawn
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn level(&self) -> AlertLevel {
        self.monitor.level()
    }

    pub fn state(&self) -> DrowsinessState {
        self.monitor.state()
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    pub fn landmarks(&self) -> &LandmarkEstimator {
        &self.landmarks
    }

    /// Reset driver state (on driver change)
    pub fn reset_state(&mut self) {
        self.monitor.reset();
        self.landmarks = LandmarkEstimator::new();
    }
}

impl<C: Clock> Drop for FaceTracker<C> {
    fn drop(&mut self) {
        self.alerts.release();
    }
}
