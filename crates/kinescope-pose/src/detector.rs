//! Pose detector capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kinescope_models::{BodyLandmark, FrameSample, UnknownLandmark};

use crate::error::PoseResult;
use crate::media::FrameBuffer;

/// One landmark reported by a detector, in image space (`y` grows down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkObservation {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl LandmarkObservation {
    pub fn new(index: usize, x: f64, y: f64, z: f64) -> Self {
        Self {
            index,
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn landmark(&self) -> Result<BodyLandmark, UnknownLandmark> {
        BodyLandmark::from_index(self.index)
    }

    /// Convert to a stored sample at time `t`, flipping the vertical axis.
    pub fn to_sample(&self, t: f64) -> FrameSample {
        FrameSample::from_image_space(t, self.x, self.y, self.z, self.visibility)
    }
}

/// Converts one frame into landmark observations.
///
/// Implementations see at most one outstanding `detect` call per sampler;
/// the sampler serializes submissions.
#[async_trait]
pub trait PoseDetector: Send + Sync {
    /// Prepare the detector (load a model, check a service).
    ///
    /// Called at most once per sampler unless it fails.
    async fn initialize(&self) -> PoseResult<()>;

    /// Detect landmarks in one frame.
    ///
    /// An empty vector means no pose was found.
    async fn detect(&self, frame: &FrameBuffer) -> PoseResult<Vec<LandmarkObservation>>;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_to_sample() {
        let observation = LandmarkObservation::new(23, 0.4, 0.25, 0.1).with_visibility(0.8);
        assert_eq!(observation.landmark().unwrap(), BodyLandmark::LeftHip);

        let sample = observation.to_sample(1.5);
        assert_eq!(sample.t, 1.5);
        assert!((sample.y - 0.75).abs() < 1e-12);
        assert_eq!(sample.visibility, Some(0.8));
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(LandmarkObservation::new(33, 0.0, 0.0, 0.0).landmark().is_err());
    }

    #[test]
    fn test_visibility_optional_in_json() {
        let observation: LandmarkObservation =
            serde_json::from_str(r#"{"index":0,"x":0.5,"y":0.5,"z":0.0}"#).unwrap();
        assert!(observation.visibility.is_none());
    }
}
