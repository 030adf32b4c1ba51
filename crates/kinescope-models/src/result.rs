//! Processing result handed to rendering and export.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::joint::JointName;
use crate::landmark::BodyLandmark;
use crate::series::JointSeries;

/// Published series keyed by joint name.
///
/// Alias joints are additional keys pointing at the same `Arc` as their
/// source; published series are never mutated.
pub type JointMap = BTreeMap<JointName, Arc<JointSeries>>;

/// Outcome of one acquisition run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub joints: JointMap,
    #[serde(rename = "processingComplete")]
    pub complete: bool,
    /// Fraction in `[0, 1]`
    pub progress: f64,
}

impl ProcessingResult {
    /// A finished result (`complete`, progress 1.0).
    pub fn completed(joints: JointMap) -> Self {
        Self {
            joints,
            complete: true,
            progress: 1.0,
        }
    }

    pub fn joint(&self, name: impl Into<JointName>) -> Option<&Arc<JointSeries>> {
        self.joints.get(&name.into())
    }

    /// Series of a canonical landmark.
    pub fn landmark(&self, landmark: BodyLandmark) -> Option<&JointSeries> {
        self.joint(landmark).map(Arc::as_ref)
    }

    /// Whether two keys share one underlying series.
    pub fn shares_series(&self, a: impl Into<JointName>, b: impl Into<JointName>) -> bool {
        match (self.joint(a), self.joint(b)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of samples across canonical landmarks.
    pub fn canonical_sample_count(&self) -> usize {
        self.joints
            .iter()
            .filter(|(name, _)| name.is_canonical())
            .map(|(_, series)| series.len())
            .sum()
    }

    /// First canonical landmark (catalog order) with at least one sample.
    pub fn first_populated(&self) -> Option<&JointSeries> {
        BodyLandmark::ALL
            .iter()
            .filter_map(|landmark| self.landmark(*landmark))
            .find(|series| !series.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::color_for;
    use crate::joint::DerivedJoint;
    use crate::sample::FrameSample;

    #[test]
    fn test_alias_sharing_and_lookup() {
        let mut wrist = JointSeries::new(BodyLandmark::LeftWrist, color_for(15));
        wrist.push(FrameSample::new(0.0, 0.1, 0.2, 0.3));
        let wrist = Arc::new(wrist);

        let mut joints = JointMap::new();
        joints.insert(BodyLandmark::LeftWrist.into(), Arc::clone(&wrist));
        joints.insert(DerivedJoint::LeftHand.into(), wrist);

        let result = ProcessingResult::completed(joints);
        assert!(result.shares_series(BodyLandmark::LeftWrist, DerivedJoint::LeftHand));
        assert!(!result.shares_series(BodyLandmark::LeftWrist, BodyLandmark::Nose));
        assert_eq!(result.canonical_sample_count(), 1);
        assert_eq!(
            result.first_populated().map(|s| s.name),
            Some(JointName::Landmark(BodyLandmark::LeftWrist))
        );
    }

    #[test]
    fn test_json_keys() {
        let mut joints = JointMap::new();
        joints.insert(
            BodyLandmark::Nose.into(),
            Arc::new(JointSeries::new(BodyLandmark::Nose, color_for(0))),
        );
        let json = serde_json::to_value(ProcessingResult::completed(joints)).unwrap();

        assert_eq!(json["processingComplete"], true);
        assert_eq!(json["progress"], 1.0);
        assert!(json["joints"]["nose"]["frames"].as_array().unwrap().is_empty());
    }
}
