//! Landmark position estimation across detector dropout
//!
//! The detector does not report every landmark on every frame. Each time a
//! landmark is seen, its position is cached as a fraction of the face box;
//! when it goes missing, the cached fraction is projected onto the current
//! face box. Offsets come only from direct observations, so estimates never
//! compound across consecutive missing frames.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::frame::{FaceBbox, FaceFrame, LandmarkId, Point};

/// Landmark position as a fraction of the enclosing face box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOffset {
    pub x: f32,
    pub y: f32,
}

impl NormalizedOffset {
    /// Offset of `point` inside `face`. The box must be usable.
    pub fn of(point: Point, face: &FaceBbox) -> Self {
        Self {
            x: (point.x - face.x) / face.width,
            y: (point.y - face.y) / face.height,
        }
    }

    /// Project this offset onto `face`
    pub fn project(&self, face: &FaceBbox) -> Point {
        Point::new(face.x + self.x * face.width, face.y + self.y * face.height)
    }
}

/// Where a resolved landmark position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixSource {
    /// Reported by the detector in this frame
    Observed,
    /// Reconstructed from a cached offset
    Extrapolated,
}

/// A resolved landmark position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFix {
    #[serde(flatten)]
    pub point: Point,
    pub source: FixSource,
}

/// Per-face landmark cache.
///
/// Entries never expire: an offset captured arbitrarily long ago is still
/// used, on the assumption that face proportions do not change much.
#[derive(Debug, Clone, Default)]
pub struct LandmarkEstimator {
    offsets: [Option<NormalizedOffset>; LandmarkId::COUNT],
}

impl LandmarkEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the cache from every landmark reported in `frame`.
    ///
    /// Must run before [`position`](Self::position) for the same frame.
    pub fn observe(&mut self, frame: &FaceFrame) {
        if frame.landmarks.is_empty() {
            return;
        }
        if !frame.face.is_usable() {
            trace!(face = ?frame.face, "Skipping landmark cache update for degenerate face box");
            return;
        }

        for landmark in &frame.landmarks {
            self.offsets[landmark.id.index()] =
                Some(NormalizedOffset::of(landmark.position, &frame.face));
        }
    }

    /// Resolve a landmark for `frame`, or `None` if it has never been seen
    /// or the current face box is too degenerate to project onto
    pub fn position(&self, frame: &FaceFrame, id: LandmarkId) -> Option<LandmarkFix> {
        if let Some(point) = frame.landmark(id) {
            return Some(LandmarkFix {
                point,
                source: FixSource::Observed,
            });
        }

        if !frame.face.is_usable() {
            return None;
        }

        self.offsets[id.index()].map(|offset| LandmarkFix {
            point: offset.project(&frame.face),
            source: FixSource::Extrapolated,
        })
    }

    /// Cached offset for a landmark
    pub fn offset(&self, id: LandmarkId) -> Option<NormalizedOffset> {
        self.offsets[id.index()]
    }

    /// Number of landmark kinds with a cached offset
    pub fn cached(&self) -> usize {
        self.offsets.iter().filter(|o| o.is_some()).count()
    }
}
