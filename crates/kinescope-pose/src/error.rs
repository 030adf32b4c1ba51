//! Error types for pose acquisition.

use std::path::PathBuf;
use thiserror::Error;

use kinescope_models::UnknownLandmark;

/// Result type for pose acquisition.
pub type PoseResult<T> = Result<T, PoseError>;

/// Result type for media source operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors surfaced by ingestion and live sampling.
///
/// `PerFrameTimeout` and `MalformedRow` are absorbed where they occur and
/// never reach the caller; they are logged and show up in progress events
/// and ingestion counters instead.
#[derive(Debug, Error)]
pub enum PoseError {
    #[error("Detector initialization failed: {0}")]
    Initialization(String),

    #[error("A sampling run is already in progress")]
    Busy,

    #[error("Sampling run cancelled")]
    Cancelled,

    #[error("Detection for frame {frame} timed out after {timeout_ms}ms")]
    PerFrameTimeout { frame: usize, timeout_ms: u64 },

    #[error("Row {row} has {fields} fields, header has {expected}")]
    MalformedRow {
        row: usize,
        fields: usize,
        expected: usize,
    },

    #[error("Input has no header row")]
    EmptyInput,

    #[error("Detection failed: {0}")]
    Detector(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error(transparent)]
    UnknownLandmark(#[from] UnknownLandmark),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PoseError {
    /// Create an initialization failure.
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization(message.into())
    }

    /// Create a detection failure.
    pub fn detector(message: impl Into<String>) -> Self {
        Self::Detector(message.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Errors from a media source.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Media not ready for capture")]
    NotReady,

    #[error("Frame capture failed at {position:.3}s: {message}")]
    CaptureFailed { position: f64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a capture failure.
    pub fn capture_failed(position: f64, message: impl Into<String>) -> Self {
        Self::CaptureFailed {
            position,
            message: message.into(),
        }
    }

    /// Whether a sampling run can skip the affected frame and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MediaError::NotReady | MediaError::CaptureFailed { .. })
    }
}
