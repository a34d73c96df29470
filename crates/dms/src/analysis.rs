//! DMS analysis results handed to the overlay and logging collaborators

use alerting::AlertCommand;
use serde::{Deserialize, Serialize};

use crate::drowsiness::DrowsinessEvent;
use crate::landmarks::LandmarkFix;
use crate::state::AlertLevel;

/// One eye as drawn on the overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeMark {
    /// Resolved position, `None` if the eye has never been located
    pub position: Option<LandmarkFix>,
    pub open: bool,
}

/// Both eyes for the overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeOverlay {
    pub left: EyeMark,
    pub right: EyeMark,
}

/// Complete per-frame analysis result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Monitor time of this frame (milliseconds)
    pub timestamp_ms: u64,

    /// Overlay update; absent when openness was uncomputed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eyes: Option<EyeOverlay>,

    /// Current drowsiness level
    pub level: AlertLevel,

    /// Length of the current closed run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_ms: Option<u64>,

    /// Edge events raised by this frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<DrowsinessEvent>,

    /// Alert commands issued for this frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<AlertCommand>,

    /// Frame skipped for missing openness scores
    pub skipped: bool,
}

impl FrameAnalysis {
    /// Check if any alert is active
    pub fn is_alerting(&self) -> bool {
        self.level != AlertLevel::None
    }
}
