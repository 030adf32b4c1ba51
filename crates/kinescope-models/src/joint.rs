//! Joint identities: canonical landmarks plus derived composite joints.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::landmark::{BodyLandmark, UnknownLandmark};

/// Composite joints derived from canonical landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DerivedJoint {
    /// Alias of the left wrist.
    LeftHand,
    /// Alias of the right wrist.
    RightHand,
    /// Midpoint of the two hips.
    CenterHip,
}

impl DerivedJoint {
    /// All derived joints.
    pub const ALL: &'static [DerivedJoint] = &[
        DerivedJoint::LeftHand,
        DerivedJoint::RightHand,
        DerivedJoint::CenterHip,
    ];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedJoint::LeftHand => "left_hand",
            DerivedJoint::RightHand => "right_hand",
            DerivedJoint::CenterHip => "center_hip",
        }
    }
}

impl fmt::Display for DerivedJoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key of a series in a processing result.
///
/// Serializes as the plain joint name (`"left_hip"`, `"center_hip"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JointName {
    Landmark(BodyLandmark),
    Derived(DerivedJoint),
}

impl JointName {
    pub fn as_str(&self) -> &'static str {
        match self {
            JointName::Landmark(landmark) => landmark.as_str(),
            JointName::Derived(derived) => derived.as_str(),
        }
    }

    /// Whether this name is one of the 33 canonical landmarks.
    pub fn is_canonical(&self) -> bool {
        matches!(self, JointName::Landmark(_))
    }
}

impl From<BodyLandmark> for JointName {
    fn from(landmark: BodyLandmark) -> Self {
        JointName::Landmark(landmark)
    }
}

impl From<DerivedJoint> for JointName {
    fn from(derived: DerivedJoint) -> Self {
        JointName::Derived(derived)
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JointName {
    type Err = UnknownLandmark;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(derived) = DerivedJoint::ALL.iter().find(|d| d.as_str() == s) {
            return Ok(JointName::Derived(*derived));
        }
        s.parse::<BodyLandmark>().map(JointName::Landmark)
    }
}

impl Serialize for JointName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JointName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
