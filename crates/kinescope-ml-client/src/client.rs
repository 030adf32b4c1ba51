//! Pose service HTTP client.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use kinescope_pose::{FrameBuffer, LandmarkObservation};

use crate::error::{MlError, MlResult};
use crate::types::{HealthResponse, PoseRequest, PoseResponse};

/// Configuration for the pose client.
#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// Base URL of the pose service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
    /// First retry delay, doubled on every further attempt
    pub retry_base_delay: Duration,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_url: std::env::var("POSE_SERVICE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("POSE_SERVICE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("POSE_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay: std::env::var("POSE_SERVICE_RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
        }
    }
}

/// Client for the pose detection service.
#[derive(Debug, Clone)]
pub struct PoseClient {
    http: Client,
    config: MlClientConfig,
}

impl PoseClient {
    /// Create a new pose client.
    pub fn new(config: MlClientConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(MlClientConfig::from_env())
    }

    pub fn config(&self) -> &MlClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if the pose service is healthy.
    pub async fn health_check(&self) -> MlResult<bool> {
        let url = self.url("/health");

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                if let Some(model) = &health.model {
                    debug!(model = %model, status = %health.status, "Pose service health");
                }
                Ok(health.is_healthy())
            }
            Ok(response) => {
                warn!(status = %response.status(), "Pose service health check failed");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Pose service health check error");
                Ok(false)
            }
        }
    }

    /// Detect landmarks in one frame.
    pub async fn detect(&self, frame: &FrameBuffer) -> MlResult<Vec<LandmarkObservation>> {
        let url = self.url("/pose");
        let request = PoseRequest::from_frame(frame);

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(MlError::Network)?;

                match response.status() {
                    status if status.is_success() => Ok(response),
                    status @ (StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS) => {
                        Err(MlError::ServiceUnavailable(format!(
                            "pose service returned {}",
                            status
                        )))
                    }
                    status => {
                        let body = response.text().await.unwrap_or_default();
                        Err(MlError::RequestFailed(format!(
                            "pose service returned {}: {}",
                            status, body
                        )))
                    }
                }
            })
            .await?;

        let body = response.text().await?;
        let pose: PoseResponse = serde_json::from_str(&body)
            .map_err(|e| MlError::InvalidResponse(format!("{}: {}", e, body)))?;

        debug!(
            timestamp = frame.timestamp,
            landmarks = pose.landmarks.len(),
            "Pose service response"
        );
        Ok(pose.landmarks)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> MlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = MlResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_base_delay * 2u32.pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Pose request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
