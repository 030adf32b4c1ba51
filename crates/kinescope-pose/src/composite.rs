//! Derived joints: aliases and temporally paired midpoints.

use std::sync::Arc;

use tracing::debug;

use kinescope_models::{
    BodyLandmark, DerivedJoint, FrameSample, JointMap, JointName, JointSeries, Rgb, NEUTRAL_GRAY,
};

/// Pairing tolerance for midpoint joints, in seconds.
pub const PAIRING_TOLERANCE_SECS: f64 = 0.1;

/// A joint computed from existing series.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeJoint {
    /// Another name for an existing series; shares the same allocation.
    Alias { name: DerivedJoint, source: JointName },
    /// Average of two series, paired by time.
    Midpoint {
        name: DerivedJoint,
        a: JointName,
        b: JointName,
        color: Rgb,
    },
}

impl CompositeJoint {
    pub fn name(&self) -> DerivedJoint {
        match self {
            CompositeJoint::Alias { name, .. } | CompositeJoint::Midpoint { name, .. } => *name,
        }
    }

    /// `left_hand`, `right_hand` and `center_hip`.
    pub fn defaults() -> Vec<CompositeJoint> {
        vec![
            CompositeJoint::Alias {
                name: DerivedJoint::LeftHand,
                source: BodyLandmark::LeftWrist.into(),
            },
            CompositeJoint::Alias {
                name: DerivedJoint::RightHand,
                source: BodyLandmark::RightWrist.into(),
            },
            CompositeJoint::Midpoint {
                name: DerivedJoint::CenterHip,
                a: BodyLandmark::LeftHip.into(),
                b: BodyLandmark::RightHip.into(),
                color: NEUTRAL_GRAY,
            },
        ]
    }
}

/// Adds composite joints to a frozen joint map.
#[derive(Debug, Clone)]
pub struct CompositeJointDeriver {
    composites: Vec<CompositeJoint>,
    tolerance: f64,
}

impl Default for CompositeJointDeriver {
    fn default() -> Self {
        Self::new(CompositeJoint::defaults())
    }
}

impl CompositeJointDeriver {
    pub fn new(composites: Vec<CompositeJoint>) -> Self {
        Self {
            composites,
            tolerance: PAIRING_TOLERANCE_SECS,
        }
    }

    /// Override the midpoint pairing tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn composites(&self) -> &[CompositeJoint] {
        &self.composites
    }

    /// Insert every configured composite whose sources are present.
    ///
    /// Source series are never touched; aliases clone the `Arc`, midpoints
    /// allocate a new series.
    pub fn augment(&self, joints: &mut JointMap) {
        for composite in &self.composites {
            match composite {
                CompositeJoint::Alias { name, source } => {
                    let Some(series) = joints.get(source).cloned() else {
                        debug!(joint = %name, source = %source, "Alias source missing, skipping");
                        continue;
                    };
                    joints.insert((*name).into(), series);
                }
                CompositeJoint::Midpoint { name, a, b, color } => {
                    let (Some(series_a), Some(series_b)) = (joints.get(a), joints.get(b)) else {
                        debug!(joint = %name, a = %a, b = %b, "Midpoint source missing, skipping");
                        continue;
                    };
                    let samples = midpoint(&series_a.samples, &series_b.samples, self.tolerance);
                    debug!(joint = %name, samples = samples.len(), "Derived midpoint joint");
                    joints.insert(
                        (*name).into(),
                        Arc::new(JointSeries::with_samples(*name, *color, samples)),
                    );
                }
            }
        }
    }
}

/// Pair each sample of `a` with the first sample of `b` within `tolerance`.
///
/// First match in `b` order, not nearest. A sample of `b` pairs at most once
/// and unmatched samples of `a` are dropped, so the output is never longer
/// than either input.
///
/// A sample of `b` whose time equals that of a later sample of `a` is held
/// for that sample, so when a frame is missing from `b` the same-frame pair
/// survives and the earlier `a` sample is dropped instead.
pub fn midpoint(a: &[FrameSample], b: &[FrameSample], tolerance: f64) -> Vec<FrameSample> {
    let held_for: Vec<Option<usize>> = b
        .iter()
        .map(|other| a.iter().rposition(|sample| sample.t == other.t))
        .collect();
    let mut paired = vec![false; b.len()];
    let mut out = Vec::with_capacity(a.len().min(b.len()));

    for (i, sample) in a.iter().enumerate() {
        let found = b.iter().enumerate().find(|(j, other)| {
            !paired[*j]
                && held_for[*j].map_or(true, |k| k <= i)
                && (other.t - sample.t).abs() < tolerance
        });

        if let Some((j, other)) = found {
            paired[j] = true;
            out.push(sample.midpoint(other));
        }
    }
    out
}
