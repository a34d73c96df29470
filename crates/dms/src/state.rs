//! Driver state tracking

use serde::{Deserialize, Serialize};

/// Escalating drowsiness alert level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    #[default]
    None,
    Mild,
    Severe,
}

/// Closed-eye timing state (carried between frames)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DrowsinessState {
    /// Eyes open, or no closed run observed yet
    #[default]
    Awake,
    /// Both eyes closed continuously since `since_ms`
    EyesClosed { since_ms: u64 },
}

impl DrowsinessState {
    pub fn eyes_closed(&self) -> bool {
        matches!(self, Self::EyesClosed { .. })
    }

    /// Start of the current closed run
    pub fn closed_since(&self) -> Option<u64> {
        match *self {
            Self::Awake => None,
            Self::EyesClosed { since_ms } => Some(since_ms),
        }
    }

    /// Length of the current closed run at `now_ms`
    pub fn closed_for(&self, now_ms: u64) -> Option<u64> {
        self.closed_since().map(|since| now_ms.saturating_sub(since))
    }
}
