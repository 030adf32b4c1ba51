//! Shared data models for Kinescope.
//!
//! This crate provides Serde-serializable types for:
//! - The 33-landmark body catalog and derived joint names
//! - Deterministic per-landmark display colors
//! - Frame samples, joint series and processing results

pub mod color;
pub mod joint;
pub mod landmark;
pub mod result;
pub mod sample;
pub mod series;

// Re-export common types
pub use color::{color_for, Rgb, NEUTRAL_GRAY};
pub use joint::{DerivedJoint, JointName};
pub use landmark::{BodyLandmark, UnknownLandmark, LANDMARK_COUNT};
pub use result::{JointMap, ProcessingResult};
pub use sample::{FrameSample, DEFAULT_VISIBILITY_THRESHOLD};
pub use series::{Axis, AxisParseError, JointSeries, NORMALIZED_UNITS};
