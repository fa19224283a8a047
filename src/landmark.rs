//! Body landmark model delivered by the pose-estimation source.
//!
//! Frames are joint-indexed arrays in the 33-point BlazePose ordering. A joint
//! that the estimator could not place is still present in the array, but with
//! a visibility below the confidence floor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of joints in a complete landmark frame
pub const JOINT_COUNT: usize = 33;

/// Default visibility below which a joint is treated as missing
pub const DEFAULT_VISIBILITY_FLOOR: f32 = 0.5;

/// Tracked body joints, in landmark array order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseJoint {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl PoseJoint {
    pub const ALL: [PoseJoint; JOINT_COUNT] = [
        PoseJoint::Nose,
        PoseJoint::LeftEyeInner,
        PoseJoint::LeftEye,
        PoseJoint::LeftEyeOuter,
        PoseJoint::RightEyeInner,
        PoseJoint::RightEye,
        PoseJoint::RightEyeOuter,
        PoseJoint::LeftEar,
        PoseJoint::RightEar,
        PoseJoint::MouthLeft,
        PoseJoint::MouthRight,
        PoseJoint::LeftShoulder,
        PoseJoint::RightShoulder,
        PoseJoint::LeftElbow,
        PoseJoint::RightElbow,
        PoseJoint::LeftWrist,
        PoseJoint::RightWrist,
        PoseJoint::LeftPinky,
        PoseJoint::RightPinky,
        PoseJoint::LeftIndex,
        PoseJoint::RightIndex,
        PoseJoint::LeftThumb,
        PoseJoint::RightThumb,
        PoseJoint::LeftHip,
        PoseJoint::RightHip,
        PoseJoint::LeftKnee,
        PoseJoint::RightKnee,
        PoseJoint::LeftAnkle,
        PoseJoint::RightAnkle,
        PoseJoint::LeftHeel,
        PoseJoint::RightHeel,
        PoseJoint::LeftFootIndex,
        PoseJoint::RightFootIndex,
    ];

    /// Position of this joint in the landmark array
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PoseJoint::Nose => "nose",
            PoseJoint::LeftEyeInner => "left_eye_inner",
            PoseJoint::LeftEye => "left_eye",
            PoseJoint::LeftEyeOuter => "left_eye_outer",
            PoseJoint::RightEyeInner => "right_eye_inner",
            PoseJoint::RightEye => "right_eye",
            PoseJoint::RightEyeOuter => "right_eye_outer",
            PoseJoint::LeftEar => "left_ear",
            PoseJoint::RightEar => "right_ear",
            PoseJoint::MouthLeft => "mouth_left",
            PoseJoint::MouthRight => "mouth_right",
            PoseJoint::LeftShoulder => "left_shoulder",
            PoseJoint::RightShoulder => "right_shoulder",
            PoseJoint::LeftElbow => "left_elbow",
            PoseJoint::RightElbow => "right_elbow",
            PoseJoint::LeftWrist => "left_wrist",
            PoseJoint::RightWrist => "right_wrist",
            PoseJoint::LeftPinky => "left_pinky",
            PoseJoint::RightPinky => "right_pinky",
            PoseJoint::LeftIndex => "left_index",
            PoseJoint::RightIndex => "right_index",
            PoseJoint::LeftThumb => "left_thumb",
            PoseJoint::RightThumb => "right_thumb",
            PoseJoint::LeftHip => "left_hip",
            PoseJoint::RightHip => "right_hip",
            PoseJoint::LeftKnee => "left_knee",
            PoseJoint::RightKnee => "right_knee",
            PoseJoint::LeftAnkle => "left_ankle",
            PoseJoint::RightAnkle => "right_ankle",
            PoseJoint::LeftHeel => "left_heel",
            PoseJoint::RightHeel => "right_heel",
            PoseJoint::LeftFootIndex => "left_foot_index",
            PoseJoint::RightFootIndex => "right_foot_index",
        }
    }
}

impl fmt::Display for PoseJoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PoseJoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoseJoint::ALL
            .iter()
            .copied()
            .find(|joint| joint.name() == s)
            .ok_or_else(|| format!("unknown joint '{}'", s))
    }
}

/// Which side of the body a rule reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySide {
    Left,
    Right,
}

impl BodySide {
    pub fn shoulder(self) -> PoseJoint {
        match self {
            BodySide::Left => PoseJoint::LeftShoulder,
            BodySide::Right => PoseJoint::RightShoulder,
        }
    }

    pub fn elbow(self) -> PoseJoint {
        match self {
            BodySide::Left => PoseJoint::LeftElbow,
            BodySide::Right => PoseJoint::RightElbow,
        }
    }

    pub fn wrist(self) -> PoseJoint {
        match self {
            BodySide::Left => PoseJoint::LeftWrist,
            BodySide::Right => PoseJoint::RightWrist,
        }
    }

    pub fn hip(self) -> PoseJoint {
        match self {
            BodySide::Left => PoseJoint::LeftHip,
            BodySide::Right => PoseJoint::RightHip,
        }
    }

    pub fn knee(self) -> PoseJoint {
        match self {
            BodySide::Left => PoseJoint::LeftKnee,
            BodySide::Right => PoseJoint::RightKnee,
        }
    }

    pub fn ankle(self) -> PoseJoint {
        match self {
            BodySide::Left => PoseJoint::LeftAnkle,
            BodySide::Right => PoseJoint::RightAnkle,
        }
    }

    pub fn foot_index(self) -> PoseJoint {
        match self {
            BodySide::Left => PoseJoint::LeftFootIndex,
            BodySide::Right => PoseJoint::RightFootIndex,
        }
    }
}

fn default_visibility() -> f32 {
    1.0
}

/// A single normalized landmark point (unit image space)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "default_visibility")]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = visibility;
        self
    }

    /// A placeholder for a joint the estimator did not place
    pub fn hidden() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }

    /// Check whether the point is usable at the given confidence floor
    pub fn is_visible(&self, floor: f32) -> bool {
        self.visibility >= floor && self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self::hidden()
    }
}

/// One frame of landmarks from the pose-estimation source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Capture time in milliseconds on the source's clock
    pub timestamp_ms: u64,
    pub landmarks: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(timestamp_ms: u64, landmarks: Vec<Landmark>) -> Self {
        Self {
            timestamp_ms,
            landmarks,
        }
    }

    /// A full-size frame with every joint hidden
    pub fn empty(timestamp_ms: u64) -> Self {
        Self::new(timestamp_ms, vec![Landmark::hidden(); JOINT_COUNT])
    }

    /// Get a joint only if it is present and above the visibility floor
    pub fn joint(&self, joint: PoseJoint, floor: f32) -> Option<&Landmark> {
        self.landmarks
            .get(joint.index())
            .filter(|landmark| landmark.is_visible(floor))
    }

    /// Set a joint, growing a short frame to full size if needed
    pub fn set(&mut self, joint: PoseJoint, landmark: Landmark) {
        if self.landmarks.len() < JOINT_COUNT {
            self.landmarks.resize(JOINT_COUNT, Landmark::hidden());
        }
        self.landmarks[joint.index()] = landmark;
    }

    pub fn is_complete(&self) -> bool {
        self.landmarks.len() == JOINT_COUNT
    }

    /// Mean visibility over a set of joints, 0 for any missing entry
    pub fn mean_visibility(&self, joints: &[PoseJoint]) -> f32 {
        if joints.is_empty() {
            return 0.0;
        }
        let total: f32 = joints
            .iter()
            .map(|joint| {
                self.landmarks
                    .get(joint.index())
                    .filter(|l| l.x.is_finite() && l.y.is_finite())
                    .map(|l| l.visibility)
                    .unwrap_or(0.0)
            })
            .sum();
        total / joints.len() as f32
    }
}
