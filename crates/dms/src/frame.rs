//! Per-frame detector output consumed by the monitor

use serde::{Deserialize, Serialize};

/// 2D screen position in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Face bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBbox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBbox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box with finite, strictly positive extent
    pub fn is_usable(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Facial landmark kinds reported by the face detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkId {
    BottomMouth,
    LeftCheek,
    LeftEarTip,
    LeftEar,
    LeftEye,
    LeftMouth,
    NoseBase,
    RightCheek,
    RightEarTip,
    RightEar,
    RightEye,
    RightMouth,
}

impl LandmarkId {
    pub const COUNT: usize = 12;

    pub const ALL: [LandmarkId; Self::COUNT] = [
        LandmarkId::BottomMouth,
        LandmarkId::LeftCheek,
        LandmarkId::LeftEarTip,
        LandmarkId::LeftEar,
        LandmarkId::LeftEye,
        LandmarkId::LeftMouth,
        LandmarkId::NoseBase,
        LandmarkId::RightCheek,
        LandmarkId::RightEarTip,
        LandmarkId::RightEar,
        LandmarkId::RightEye,
        LandmarkId::RightMouth,
    ];

    /// Slot in a table keyed by landmark kind
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A landmark directly observed in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: LandmarkId,
    #[serde(flatten)]
    pub position: Point,
}

impl Landmark {
    pub fn new(id: LandmarkId, x: f32, y: f32) -> Self {
        Self {
            id,
            position: Point::new(x, y),
        }
    }
}

/// Per-eye openness probabilities for one frame.
///
/// `None` means the detector could not compute a score for that eye.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeReading {
    pub left: Option<f32>,
    pub right: Option<f32>,
}

impl EyeReading {
    pub fn new(left: f32, right: f32) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }

    /// Reading with both eyes uncomputed
    pub fn uncomputed() -> Self {
        Self::default()
    }

    /// Build from raw detector probabilities, where a negative value is the
    /// detector's "uncomputed" sentinel.
    pub fn from_probabilities(left: f32, right: f32) -> Self {
        let score = |p: f32| (p >= 0.0).then_some(p);
        Self {
            left: score(left),
            right: score(right),
        }
    }

    /// Both scores, or `None` if either eye is uncomputed
    pub fn scores(&self) -> Option<(f32, f32)> {
        Some((self.left?, self.right?))
    }
}

/// Everything the detector reports about a tracked face in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceFrame {
    pub face: FaceBbox,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub eyes: EyeReading,
}

impl FaceFrame {
    pub fn new(face: FaceBbox) -> Self {
        Self {
            face,
            landmarks: Vec::new(),
            eyes: EyeReading::uncomputed(),
        }
    }

    pub fn with_landmark(mut self, id: LandmarkId, x: f32, y: f32) -> Self {
        self.landmarks.push(Landmark::new(id, x, y));
        self
    }

    pub fn with_eyes(mut self, eyes: EyeReading) -> Self {
        self.eyes = eyes;
        self
    }

    /// Position of a landmark reported directly in this frame
    pub fn landmark(&self, id: LandmarkId) -> Option<Point> {
        self.landmarks
            .iter()
            .find(|landmark| landmark.id == id)
            .map(|landmark| landmark.position)
    }
}
