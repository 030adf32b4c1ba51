//! Single landmark observations.

use serde::{Deserialize, Serialize};

/// Minimum visibility a sample must exceed to be kept.
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.5;

/// One timestamped coordinate observation for a single landmark.
///
/// Coordinates are normalized to the frame; `y` grows upwards (see
/// [`FrameSample::from_image_space`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    /// Seconds from media start
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Detector confidence in `[0, 1]`, when the source reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl FrameSample {
    /// Create a sample without visibility.
    pub fn new(t: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            t,
            x,
            y,
            z,
            visibility: None,
        }
    }

    /// Create a sample from image-space coordinates.
    ///
    /// Image space has `y` growing downwards; stored samples flip it so that
    /// larger values mean "up". Every acquisition path goes through here.
    pub fn from_image_space(t: f64, x: f64, image_y: f64, z: f64, visibility: Option<f64>) -> Self {
        Self {
            t,
            x,
            y: 1.0 - image_y,
            z,
            visibility,
        }
    }

    /// Attach a visibility score.
    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Whether the sample may enter a series.
    ///
    /// Time and coordinates must be finite; a reported visibility must be
    /// strictly above `min_visibility`.
    pub fn is_acceptable(&self, min_visibility: f64) -> bool {
        let finite = self.t.is_finite()
            && self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite();

        finite && self.visibility.map_or(true, |v| v > min_visibility)
    }

    /// Componentwise midpoint, stamped with this sample's time.
    pub fn midpoint(&self, other: &FrameSample) -> FrameSample {
        FrameSample::new(
            self.t,
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }
}
