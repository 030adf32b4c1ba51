//! Pose landmark time-series acquisition.
//!
//! Two interchangeable paths fill the same per-landmark series:
//! - [`TableIngestor`] parses a pre-computed detection table
//! - [`FrameSampler`] drives a [`PoseDetector`] over a [`MediaSource`]
//!
//! Both apply the same acceptance rule and vertical-axis convention and add
//! the same composite joints, so their [`ProcessingResult`]s share one shape.

pub mod composite;
pub mod config;
pub mod detector;
pub mod error;
pub mod export;
pub mod ingest;
pub mod media;
pub mod metrics;
pub mod progress;
pub mod sampler;
pub mod store;
pub mod validation;

pub use composite::{CompositeJoint, CompositeJointDeriver, PAIRING_TOLERANCE_SECS};
pub use config::{IngestConfig, SamplerConfig, SamplingMode};
pub use detector::{LandmarkObservation, PoseDetector};
pub use error::{MediaError, MediaResult, PoseError, PoseResult};
pub use export::ResultExporter;
pub use ingest::{IngestOutcome, TableIngestor};
pub use media::{FfmpegMediaSource, FrameBuffer, FrameFormat, MediaSource, ReadyState};
pub use progress::{MissReason, ProgressEvent, ProgressReceiver, ProgressSender, RunSummary};
pub use sampler::{FrameSampler, SamplerState, SamplingOutcome};
pub use store::TimeSeriesStore;
pub use validation::{ValidationReport, ValidationWarning};

pub use kinescope_models::ProcessingResult;
