//! Pose service request/response types.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use kinescope_pose::{FrameBuffer, FrameFormat, LandmarkObservation};

/// One frame submitted for detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseRequest {
    /// Base64 encoded frame bytes
    pub image: String,
    pub format: FrameFormat,
    pub width: u32,
    pub height: u32,
    /// Media position of the frame in seconds
    pub timestamp: f64,
}

impl PoseRequest {
    pub fn from_frame(frame: &FrameBuffer) -> Self {
        Self {
            image: STANDARD.encode(&frame.data),
            format: frame.format,
            width: frame.width,
            height: frame.height,
            timestamp: frame.timestamp,
        }
    }
}

/// Landmarks found in a frame, in image space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoseResponse {
    #[serde(default)]
    pub landmarks: Vec<LandmarkObservation>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" || self.status == "ok"
    }
}
