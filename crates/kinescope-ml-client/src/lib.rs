//! Client for a remote pose-landmark detection service.
//!
//! The service exposes `GET /health` and `POST /pose`, which takes one
//! encoded frame and answers with the landmarks found in it.
//! [`HttpPoseDetector`] plugs the client into a frame sampler.

pub mod client;
pub mod detector;
pub mod error;
pub mod types;

pub use client::{MlClientConfig, PoseClient};
pub use detector::HttpPoseDetector;
pub use error::{MlError, MlResult};
pub use types::{HealthResponse, PoseRequest, PoseResponse};
