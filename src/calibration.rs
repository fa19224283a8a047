//! Per-subject body calibration
//!
//! Calibration is captured once, before scoring, from a neutral standing
//! frame. It only shifts the thresholds an exercise evaluates against; the
//! angle and distance formulas never change. Re-calibrating replaces the
//! stored entry instead of editing it.

use crate::error::{CalibrationError, FormguardError, Result};
use crate::exercise::ExerciseKind;
use crate::geometry::{angle, distance};
use crate::landmark::{BodySide, LandmarkFrame, PoseJoint};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Thigh length over shin length
pub const FEMUR_TIBIA_RATIO: &str = "femur_tibia_ratio";
/// Shoulder width over hip width
pub const SHOULDER_HIP_RATIO: &str = "shoulder_hip_ratio";

/// Three joints whose angle is measured at the middle one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JointTriple(pub PoseJoint, pub PoseJoint, pub PoseJoint);

impl JointTriple {
    pub fn new(a: PoseJoint, vertex: PoseJoint, c: PoseJoint) -> Self {
        Self(a, vertex, c)
    }
}

/// Two joints whose distance is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JointPair(pub PoseJoint, pub PoseJoint);

impl JointPair {
    pub fn new(a: PoseJoint, b: PoseJoint) -> Self {
        Self(a, b)
    }
}

impl fmt::Display for JointTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.0, self.1, self.2)
    }
}

impl fmt::Display for JointPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

fn parse_joints(key: &str) -> std::result::Result<Vec<PoseJoint>, CalibrationError> {
    key.split('-')
        .map(|name| {
            name.parse::<PoseJoint>()
                .map_err(|_| CalibrationError::InvalidJointKey {
                    key: key.to_string(),
                })
        })
        .collect()
}

impl FromStr for JointTriple {
    type Err = CalibrationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match parse_joints(s)?.as_slice() {
            [a, b, c] => Ok(Self(*a, *b, *c)),
            _ => Err(CalibrationError::InvalidJointKey { key: s.to_string() }),
        }
    }
}

impl FromStr for JointPair {
    type Err = CalibrationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match parse_joints(s)?.as_slice() {
            [a, b] => Ok(Self(*a, *b)),
            _ => Err(CalibrationError::InvalidJointKey { key: s.to_string() }),
        }
    }
}

macro_rules! string_keyed_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let key = String::deserialize(deserializer)?;
                key.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_keyed_serde!(JointTriple);
string_keyed_serde!(JointPair);

/// Baseline body measurements for one subject and exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    pub subject_id: String,
    pub exercise: ExerciseKind,
    #[serde(default)]
    pub baseline_angles: BTreeMap<JointTriple, f32>,
    #[serde(default)]
    pub baseline_distances: BTreeMap<JointPair, f32>,
    #[serde(default)]
    pub body_proportions: BTreeMap<String, f32>,
    pub calibrated_at: DateTime<Utc>,
}

impl CalibrationData {
    pub fn new<S: Into<String>>(subject_id: S, exercise: ExerciseKind) -> Self {
        Self {
            subject_id: subject_id.into(),
            exercise,
            baseline_angles: BTreeMap::new(),
            baseline_distances: BTreeMap::new(),
            body_proportions: BTreeMap::new(),
            calibrated_at: Utc::now(),
        }
    }

    pub fn with_angle(mut self, triple: JointTriple, degrees: f32) -> Self {
        self.baseline_angles.insert(triple, degrees);
        self
    }

    pub fn with_distance(mut self, pair: JointPair, length: f32) -> Self {
        self.baseline_distances.insert(pair, length);
        self
    }

    pub fn with_proportion<S: Into<String>>(mut self, name: S, ratio: f32) -> Self {
        self.body_proportions.insert(name.into(), ratio);
        self
    }

    /// Derive baselines from a neutral standing frame
    pub fn capture<S: Into<String>>(
        subject_id: S,
        exercise: ExerciseKind,
        frame: &LandmarkFrame,
        visibility_floor: f32,
    ) -> Result<Self> {
        let mut data = Self::new(subject_id, exercise);
        let mut femur_total = 0.0;
        let mut tibia_total = 0.0;
        let mut sides_seen = 0;

        for side in [BodySide::Left, BodySide::Right] {
            let joints = [side.shoulder(), side.hip(), side.knee(), side.ankle()];
            let points: Option<Vec<_>> = joints
                .iter()
                .map(|joint| frame.joint(*joint, visibility_floor))
                .collect();
            let Some(points) = points else {
                continue;
            };
            let (shoulder, hip, knee, ankle) = (points[0], points[1], points[2], points[3]);

            data.baseline_angles.insert(
                JointTriple::new(side.shoulder(), side.hip(), side.ankle()),
                angle(shoulder, hip, ankle),
            );
            data.baseline_angles.insert(
                JointTriple::new(side.hip(), side.knee(), side.ankle()),
                angle(hip, knee, ankle),
            );

            let femur = distance(hip, knee);
            let tibia = distance(knee, ankle);
            data.baseline_distances
                .insert(JointPair::new(side.hip(), side.knee()), femur);
            data.baseline_distances
                .insert(JointPair::new(side.knee(), side.ankle()), tibia);
            femur_total += femur;
            tibia_total += tibia;
            sides_seen += 1;

            if let (Some(elbow), Some(wrist)) = (
                frame.joint(side.elbow(), visibility_floor),
                frame.joint(side.wrist(), visibility_floor),
            ) {
                data.baseline_angles.insert(
                    JointTriple::new(side.shoulder(), side.elbow(), side.wrist()),
                    angle(shoulder, elbow, wrist),
                );
            }
        }

        if sides_seen == 0 {
            return Err(CalibrationError::JointNotVisible {
                joint: PoseJoint::LeftHip.name(),
            }
            .into());
        }

        if tibia_total > 0.0 {
            data.body_proportions
                .insert(FEMUR_TIBIA_RATIO.to_string(), femur_total / tibia_total);
        }

        let shoulders = (
            frame.joint(PoseJoint::LeftShoulder, visibility_floor),
            frame.joint(PoseJoint::RightShoulder, visibility_floor),
        );
        let hips = (
            frame.joint(PoseJoint::LeftHip, visibility_floor),
            frame.joint(PoseJoint::RightHip, visibility_floor),
        );
        if let ((Some(ls), Some(rs)), (Some(lh), Some(rh))) = (shoulders, hips) {
            let shoulder_width = distance(ls, rs);
            let hip_width = distance(lh, rh);
            data.baseline_distances.insert(
                JointPair::new(PoseJoint::LeftShoulder, PoseJoint::RightShoulder),
                shoulder_width,
            );
            data.baseline_distances
                .insert(JointPair::new(PoseJoint::LeftHip, PoseJoint::RightHip), hip_width);
            if hip_width > 0.0 {
                data.body_proportions
                    .insert(SHOULDER_HIP_RATIO.to_string(), shoulder_width / hip_width);
            }
        }

        debug!(
            "Captured calibration for {} ({}): {} angles, {} distances",
            data.subject_id,
            data.exercise,
            data.baseline_angles.len(),
            data.baseline_distances.len()
        );

        Ok(data)
    }

    pub fn baseline_angle(&self, triple: JointTriple) -> Option<f32> {
        self.baseline_angles.get(&triple).copied()
    }

    /// Mean of a left/right baseline angle over whichever sides were captured
    pub fn side_angle(&self, triple: impl Fn(BodySide) -> JointTriple) -> Option<f32> {
        let values: Vec<f32> = [BodySide::Left, BodySide::Right]
            .into_iter()
            .filter_map(|side| self.baseline_angle(triple(side)))
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f32>() / values.len() as f32)
        }
    }

    pub fn baseline_distance(&self, pair: JointPair) -> Option<f32> {
        self.baseline_distances.get(&pair).copied()
    }

    pub fn proportion(&self, name: &str) -> Option<f32> {
        self.body_proportions.get(name).copied()
    }
}

/// Calibrations keyed by subject and exercise, shareable across sessions
#[derive(Debug, Default)]
pub struct CalibrationStore {
    entries: RwLock<HashMap<(String, ExerciseKind), Arc<CalibrationData>>>,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a calibration, superseding any previous one for the same pair
    pub fn set(&self, data: CalibrationData) {
        let key = (data.subject_id.clone(), data.exercise);
        info!("Storing calibration for {} ({})", key.0, key.1);
        self.entries.write().insert(key, Arc::new(data));
    }

    pub fn get(&self, subject_id: &str, exercise: ExerciseKind) -> Option<Arc<CalibrationData>> {
        self.entries
            .read()
            .get(&(subject_id.to_string(), exercise))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Load every calibration from a JSON array file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let entries: Vec<CalibrationData> = serde_json::from_str(&content)?;
        let store = Self::new();
        for data in entries {
            store.set(data);
        }
        info!(
            "Loaded {} calibrations from {}",
            store.len(),
            path.as_ref().display()
        );
        Ok(store)
    }

    /// Write every calibration to a JSON array file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut entries: Vec<CalibrationData> = self
            .entries
            .read()
            .values()
            .map(|data| data.as_ref().clone())
            .collect();
        entries.sort_by(|a, b| {
            (a.subject_id.as_str(), a.exercise).cmp(&(b.subject_id.as_str(), b.exercise))
        });
        let content = serde_json::to_string_pretty(&entries).map_err(FormguardError::from)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
