//! [`PoseDetector`] backed by the remote pose service.

use async_trait::async_trait;
use tracing::info;

use kinescope_pose::{FrameBuffer, LandmarkObservation, PoseDetector, PoseError, PoseResult};

use crate::client::PoseClient;

/// Detector that forwards every frame to the pose service.
#[derive(Debug, Clone)]
pub struct HttpPoseDetector {
    client: PoseClient,
}

impl HttpPoseDetector {
    pub fn new(client: PoseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &PoseClient {
        &self.client
    }
}

#[async_trait]
impl PoseDetector for HttpPoseDetector {
    async fn initialize(&self) -> PoseResult<()> {
        if self.client.health_check().await? {
            info!(url = %self.client.config().base_url, "Pose service ready");
            Ok(())
        } else {
            Err(PoseError::initialization(format!(
                "pose service at {} is not healthy",
                self.client.config().base_url
            )))
        }
    }

    async fn detect(&self, frame: &FrameBuffer) -> PoseResult<Vec<LandmarkObservation>> {
        Ok(self.client.detect(frame).await?)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
