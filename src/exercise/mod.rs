//! Supported exercises and their form rules
//!
//! The set of exercises is closed: adding one means adding an
//! [`ExerciseKind`] variant, an [`Exercise`] variant with its own thresholds,
//! and a rule function. Every match over these enums is exhaustive, so the
//! compiler points at each place that needs the new exercise.

mod rules;
mod thresholds;

#[cfg(test)]
pub(crate) mod fixtures;

pub use rules::RuleOutcome;
pub use thresholds::{
    BicepCurlThresholds, JumpingJackThresholds, LungeThresholds, PushUpThresholds,
    ScoreBands, SitUpThresholds, SquatThresholds,
};

use crate::analyzer::ExerciseState;
use crate::calibration::CalibrationData;
use crate::error::FormguardError;
use crate::landmark::LandmarkFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exercise identifiers, stable across the wire and in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    PushUp,
    Squat,
    Lunge,
    SitUp,
    JumpingJack,
    BicepCurl,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 6] = [
        ExerciseKind::PushUp,
        ExerciseKind::Squat,
        ExerciseKind::Lunge,
        ExerciseKind::SitUp,
        ExerciseKind::JumpingJack,
        ExerciseKind::BicepCurl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseKind::PushUp => "push_up",
            ExerciseKind::Squat => "squat",
            ExerciseKind::Lunge => "lunge",
            ExerciseKind::SitUp => "sit_up",
            ExerciseKind::JumpingJack => "jumping_jack",
            ExerciseKind::BicepCurl => "bicep_curl",
        }
    }

    /// Rough energy cost of one repetition in kilocalories
    pub fn calories_per_rep(self) -> f32 {
        match self {
            ExerciseKind::PushUp => 0.5,
            ExerciseKind::Squat => 0.45,
            ExerciseKind::Lunge => 0.5,
            ExerciseKind::SitUp => 0.3,
            ExerciseKind::JumpingJack => 0.2,
            ExerciseKind::BicepCurl => 0.15,
        }
    }

    /// The state a subject rests in between repetitions
    pub fn rest_state(self) -> ExerciseState {
        match self {
            ExerciseKind::PushUp | ExerciseKind::Squat | ExerciseKind::Lunge => ExerciseState::Up,
            ExerciseKind::SitUp | ExerciseKind::JumpingJack | ExerciseKind::BicepCurl => {
                ExerciseState::Down
            }
        }
    }

    /// Mistake reported when a repetition turns back before completing
    pub fn partial_rep_mistake(self) -> MistakeCode {
        match self {
            ExerciseKind::PushUp | ExerciseKind::Squat | ExerciseKind::Lunge => {
                MistakeCode::InsufficientDepth
            }
            ExerciseKind::SitUp | ExerciseKind::JumpingJack | ExerciseKind::BicepCurl => {
                MistakeCode::IncompleteRange
            }
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = FormguardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ExerciseKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| FormguardError::unknown_exercise(s))
    }
}

/// Coarse movement phase of a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosePhase {
    /// Top of the movement (arms extended, standing, sitting up, arms overhead)
    Up,
    /// Bottom of the movement
    Down,
    /// Moved clearly away from the rest position without reaching the other end
    Partial,
    /// Anywhere else in the range of motion
    Transition,
}

/// Form mistakes a rule can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MistakeCode {
    BackNotStraight,
    ElbowsFlared,
    InsufficientDepth,
    TorsoLeaning,
    KneesPastToes,
    KneesCaving,
    LegsStraight,
    FeetLifted,
    LegsNotApart,
    ArmsBent,
    ElbowDrift,
    TorsoSwing,
    IncompleteRange,
}

impl MistakeCode {
    pub fn as_str(self) -> &'static str {
        match self {
            MistakeCode::BackNotStraight => "back_not_straight",
            MistakeCode::ElbowsFlared => "elbows_flared",
            MistakeCode::InsufficientDepth => "insufficient_depth",
            MistakeCode::TorsoLeaning => "torso_leaning",
            MistakeCode::KneesPastToes => "knees_past_toes",
            MistakeCode::KneesCaving => "knees_caving",
            MistakeCode::LegsStraight => "legs_straight",
            MistakeCode::FeetLifted => "feet_lifted",
            MistakeCode::LegsNotApart => "legs_not_apart",
            MistakeCode::ArmsBent => "arms_bent",
            MistakeCode::ElbowDrift => "elbow_drift",
            MistakeCode::TorsoSwing => "torso_swing",
            MistakeCode::IncompleteRange => "incomplete_range",
        }
    }

    /// Short coaching cue shown alongside the mistake
    pub fn suggestion(self) -> &'static str {
        match self {
            MistakeCode::BackNotStraight => "Keep your body in a straight line from head to heels",
            MistakeCode::ElbowsFlared => "Tuck your elbows closer to your body",
            MistakeCode::InsufficientDepth => "Go lower to complete the full range of motion",
            MistakeCode::TorsoLeaning => "Keep your chest up and torso upright",
            MistakeCode::KneesPastToes => "Sit back into your hips so your knees stay behind your toes",
            MistakeCode::KneesCaving => "Push your knees out in line with your feet",
            MistakeCode::LegsStraight => "Keep your knees bent",
            MistakeCode::FeetLifted => "Keep your feet flat on the floor",
            MistakeCode::LegsNotApart => "Jump your feet wider than your shoulders",
            MistakeCode::ArmsBent => "Straighten your arms overhead",
            MistakeCode::ElbowDrift => "Pin your elbows to your sides",
            MistakeCode::TorsoSwing => "Stop swinging, keep your torso still",
            MistakeCode::IncompleteRange => "Complete the full range of motion",
        }
    }
}

impl fmt::Display for MistakeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality band of a form score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormGrade {
    Perfect,
    Good,
    NeedsWork,
}

/// An exercise together with the thresholds its rule evaluates against
#[derive(Debug, Clone, PartialEq)]
pub enum Exercise {
    PushUp(PushUpThresholds),
    Squat(SquatThresholds),
    Lunge(LungeThresholds),
    SitUp(SitUpThresholds),
    JumpingJack(JumpingJackThresholds),
    BicepCurl(BicepCurlThresholds),
}

impl Exercise {
    /// Exercise with population-average thresholds
    pub fn new(kind: ExerciseKind) -> Self {
        match kind {
            ExerciseKind::PushUp => Exercise::PushUp(PushUpThresholds::default()),
            ExerciseKind::Squat => Exercise::Squat(SquatThresholds::default()),
            ExerciseKind::Lunge => Exercise::Lunge(LungeThresholds::default()),
            ExerciseKind::SitUp => Exercise::SitUp(SitUpThresholds::default()),
            ExerciseKind::JumpingJack => Exercise::JumpingJack(JumpingJackThresholds::default()),
            ExerciseKind::BicepCurl => Exercise::BicepCurl(BicepCurlThresholds::default()),
        }
    }

    /// Exercise with thresholds shifted by the subject's calibration, if any
    pub fn calibrated(kind: ExerciseKind, calibration: Option<&CalibrationData>) -> Self {
        let exercise = Self::new(kind);
        match calibration {
            Some(data) => exercise.apply_calibration(data),
            None => exercise,
        }
    }

    fn apply_calibration(self, data: &CalibrationData) -> Self {
        match self {
            Exercise::PushUp(t) => Exercise::PushUp(t.calibrate(data)),
            Exercise::Squat(t) => Exercise::Squat(t.calibrate(data)),
            Exercise::Lunge(t) => Exercise::Lunge(t.calibrate(data)),
            Exercise::SitUp(t) => Exercise::SitUp(t.calibrate(data)),
            Exercise::JumpingJack(t) => Exercise::JumpingJack(t.calibrate(data)),
            Exercise::BicepCurl(t) => Exercise::BicepCurl(t.calibrate(data)),
        }
    }

    pub fn kind(&self) -> ExerciseKind {
        match self {
            Exercise::PushUp(_) => ExerciseKind::PushUp,
            Exercise::Squat(_) => ExerciseKind::Squat,
            Exercise::Lunge(_) => ExerciseKind::Lunge,
            Exercise::SitUp(_) => ExerciseKind::SitUp,
            Exercise::JumpingJack(_) => ExerciseKind::JumpingJack,
            Exercise::BicepCurl(_) => ExerciseKind::BicepCurl,
        }
    }

    /// Run the exercise's rule over one frame
    pub fn evaluate(&self, frame: &LandmarkFrame, visibility_floor: f32) -> RuleOutcome {
        match self {
            Exercise::PushUp(t) => rules::push_up(frame, t, visibility_floor),
            Exercise::Squat(t) => rules::squat(frame, t, visibility_floor),
            Exercise::Lunge(t) => rules::lunge(frame, t, visibility_floor),
            Exercise::SitUp(t) => rules::sit_up(frame, t, visibility_floor),
            Exercise::JumpingJack(t) => rules::jumping_jack(frame, t, visibility_floor),
            Exercise::BicepCurl(t) => rules::bicep_curl(frame, t, visibility_floor),
        }
    }

    pub fn bands(&self) -> ScoreBands {
        match self {
            Exercise::PushUp(t) => t.bands,
            Exercise::Squat(t) => t.bands,
            Exercise::Lunge(t) => t.bands,
            Exercise::SitUp(t) => t.bands,
            Exercise::JumpingJack(t) => t.bands,
            Exercise::BicepCurl(t) => t.bands,
        }
    }

    /// Penalty applied to a partial repetition
    pub fn partial_rep_penalty(&self) -> u8 {
        match self {
            Exercise::PushUp(t) => t.depth_penalty,
            Exercise::Squat(t) => t.depth_penalty,
            Exercise::Lunge(t) => t.depth_penalty,
            Exercise::SitUp(t) => t.range_penalty,
            Exercise::JumpingJack(t) => t.range_penalty,
            Exercise::BicepCurl(t) => t.range_penalty,
        }
    }

    /// Sum of every penalty this exercise can apply to one frame
    pub fn max_deduction(&self) -> u32 {
        match self {
            Exercise::PushUp(t) => t.max_deduction(),
            Exercise::Squat(t) => t.max_deduction(),
            Exercise::Lunge(t) => t.max_deduction(),
            Exercise::SitUp(t) => t.max_deduction(),
            Exercise::JumpingJack(t) => t.max_deduction(),
            Exercise::BicepCurl(t) => t.max_deduction(),
        }
    }

    pub fn grade(&self, score: u8) -> FormGrade {
        self.bands().grade(score)
    }
}
