//! Per-joint time series.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::color::Rgb;
use crate::joint::JointName;
use crate::sample::FrameSample;

/// Unit tag for normalized frame coordinates.
pub const NORMALIZED_UNITS: &str = "normalized";

/// Coordinate axis of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn of(&self, sample: &FrameSample) -> f64 {
        match self {
            Axis::X => sample.x,
            Axis::Y => sample.y,
            Axis::Z => sample.z,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Axis {
    type Err = AxisParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(AxisParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown axis: {0}")]
pub struct AxisParseError(String);

/// Ordered samples of one joint.
///
/// Samples keep insertion order; nothing here sorts or deduplicates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSeries {
    pub name: JointName,
    #[serde(rename = "frames")]
    pub samples: Vec<FrameSample>,
    pub color: Rgb,
    pub units: String,
}

impl JointSeries {
    /// Create an empty series in normalized units.
    pub fn new(name: impl Into<JointName>, color: Rgb) -> Self {
        Self {
            name: name.into(),
            samples: Vec::new(),
            color,
            units: NORMALIZED_UNITS.to_string(),
        }
    }

    /// Create a series from existing samples.
    pub fn with_samples(name: impl Into<JointName>, color: Rgb, samples: Vec<FrameSample>) -> Self {
        Self {
            samples,
            ..Self::new(name, color)
        }
    }

    pub fn push(&mut self, sample: FrameSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Earliest and latest sample times, or `None` when empty.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        self.samples.iter().fold(None, |span, sample| match span {
            None => Some((sample.t, sample.t)),
            Some((min, max)) => Some((min.min(sample.t), max.max(sample.t))),
        })
    }

    /// `(t, value)` pairs for one axis.
    pub fn component(&self, axis: Axis) -> Vec<(f64, f64)> {
        self.samples.iter().map(|s| (s.t, axis.of(s))).collect()
    }

    /// `(t, x, y)` triples.
    pub fn trajectory_2d(&self) -> Vec<(f64, f64, f64)> {
        self.samples.iter().map(|s| (s.t, s.x, s.y)).collect()
    }

    /// Planar speed between consecutive samples, stamped at the later sample.
    ///
    /// Pairs with a non-positive time step are skipped.
    pub fn speed(&self) -> Vec<(f64, f64)> {
        self.samples
            .windows(2)
            .filter_map(|pair| {
                let (prev, next) = (&pair[0], &pair[1]);
                let dt = next.t - prev.t;
                if dt <= 0.0 {
                    return None;
                }
                let distance = (next.x - prev.x).hypot(next.y - prev.y);
                Some((next.t, distance / dt))
            })
            .collect()
    }
}
