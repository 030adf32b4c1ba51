//! Pose service client error types.

use thiserror::Error;

use kinescope_pose::PoseError;

pub type MlResult<T> = Result<T, MlError>;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("Pose service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MlError {
    pub fn is_retryable(&self) -> bool {
        match self {
            MlError::ServiceUnavailable(_) => true,
            MlError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

impl From<MlError> for PoseError {
    fn from(err: MlError) -> Self {
        PoseError::detector(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(MlError::ServiceUnavailable("503".into()).is_retryable());
        assert!(!MlError::RequestFailed("400".into()).is_retryable());
        assert!(!MlError::InvalidResponse("not json".into()).is_retryable());
    }

    #[test]
    fn test_into_pose_error() {
        let err: PoseError = MlError::RequestFailed("bad frame".into()).into();
        assert!(matches!(err, PoseError::Detector(message) if message.contains("bad frame")));
    }
}
