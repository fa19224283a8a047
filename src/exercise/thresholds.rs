use super::FormGrade;
use crate::calibration::{CalibrationData, JointTriple, FEMUR_TIBIA_RATIO};
use crate::landmark::BodySide;

/// Score cut-offs for the perfect and good grades
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBands {
    pub perfect: u8,
    pub good: u8,
}

impl ScoreBands {
    pub fn grade(&self, score: u8) -> FormGrade {
        if score >= self.perfect {
            FormGrade::Perfect
        } else if score >= self.good {
            FormGrade::Good
        } else {
            FormGrade::NeedsWork
        }
    }
}

impl Default for ScoreBands {
    fn default() -> Self {
        Self {
            perfect: 90,
            good: 75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushUpThresholds {
    pub bands: ScoreBands,
    /// Elbow angle at or above which the arms count as extended
    pub up_angle: f32,
    /// Elbow angle at or below which the chest counts as lowered
    pub down_angle: f32,
    /// Elbow angle at or below which a descent counts as started
    pub partial_angle: f32,
    /// Minimum tilt of the shoulder-ankle line away from vertical
    pub min_body_inclination: f32,
    /// Allowed deviation of shoulder-hip-ankle from a straight line
    pub spine_tolerance: f32,
    /// Elbow spread allowed as a multiple of shoulder width
    pub elbow_flare_ratio: f32,
    pub back_penalty: u8,
    pub flare_penalty: u8,
    pub depth_penalty: u8,
}

impl Default for PushUpThresholds {
    fn default() -> Self {
        Self {
            bands: ScoreBands::default(),
            up_angle: 160.0,
            down_angle: 90.0,
            partial_angle: 130.0,
            min_body_inclination: 55.0,
            spine_tolerance: 15.0,
            elbow_flare_ratio: 1.3,
            back_penalty: 15,
            flare_penalty: 10,
            depth_penalty: 20,
        }
    }
}

impl PushUpThresholds {
    pub(super) fn calibrate(mut self, data: &CalibrationData) -> Self {
        self.spine_tolerance = widen_spine_tolerance(self.spine_tolerance, data);
        self.up_angle = lower_extension(self.up_angle, self.partial_angle, elbow_baseline(data));
        self
    }

    pub fn max_deduction(&self) -> u32 {
        sum(&[self.back_penalty, self.flare_penalty, self.depth_penalty])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquatThresholds {
    pub bands: ScoreBands,
    /// Knee angle at or above which the subject is standing
    pub up_angle: f32,
    /// Knee angle at or below which the squat is deep enough
    pub down_angle: f32,
    pub partial_angle: f32,
    /// Maximum lean of the hip-shoulder line away from vertical
    pub max_torso_lean: f32,
    /// How far the knee may travel past the toes, in normalized units
    pub knee_toe_tolerance: f32,
    /// Minimum knee spread as a fraction of ankle spread (front view)
    pub knee_cave_ratio: f32,
    pub torso_penalty: u8,
    pub knee_toe_penalty: u8,
    pub knee_cave_penalty: u8,
    pub depth_penalty: u8,
}

impl Default for SquatThresholds {
    fn default() -> Self {
        Self {
            bands: ScoreBands::default(),
            up_angle: 160.0,
            down_angle: 100.0,
            partial_angle: 135.0,
            max_torso_lean: 45.0,
            knee_toe_tolerance: 0.05,
            knee_cave_ratio: 0.8,
            torso_penalty: 15,
            knee_toe_penalty: 15,
            knee_cave_penalty: 15,
            depth_penalty: 20,
        }
    }
}

impl SquatThresholds {
    pub(super) fn calibrate(mut self, data: &CalibrationData) -> Self {
        self.knee_toe_tolerance = scale_knee_tolerance(self.knee_toe_tolerance, data);
        self.up_angle = lower_extension(self.up_angle, self.partial_angle, knee_baseline(data));
        self
    }

    pub fn max_deduction(&self) -> u32 {
        sum(&[
            self.torso_penalty,
            self.knee_toe_penalty,
            self.knee_cave_penalty,
            self.depth_penalty,
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LungeThresholds {
    pub bands: ScoreBands,
    pub up_angle: f32,
    pub down_angle: f32,
    pub partial_angle: f32,
    pub max_torso_lean: f32,
    pub knee_toe_tolerance: f32,
    pub torso_penalty: u8,
    pub knee_toe_penalty: u8,
    pub depth_penalty: u8,
}

impl Default for LungeThresholds {
    fn default() -> Self {
        Self {
            bands: ScoreBands::default(),
            up_angle: 160.0,
            down_angle: 100.0,
            partial_angle: 135.0,
            max_torso_lean: 30.0,
            knee_toe_tolerance: 0.05,
            torso_penalty: 15,
            knee_toe_penalty: 15,
            depth_penalty: 20,
        }
    }
}

impl LungeThresholds {
    pub(super) fn calibrate(mut self, data: &CalibrationData) -> Self {
        self.knee_toe_tolerance = scale_knee_tolerance(self.knee_toe_tolerance, data);
        self.up_angle = lower_extension(self.up_angle, self.partial_angle, knee_baseline(data));
        self
    }

    pub fn max_deduction(&self) -> u32 {
        sum(&[self.torso_penalty, self.knee_toe_penalty, self.depth_penalty])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SitUpThresholds {
    pub bands: ScoreBands,
    /// Shoulder-hip-knee angle at or below which the subject is sitting up
    pub up_angle: f32,
    /// Shoulder-hip-knee angle at or above which the subject is lying back
    pub down_angle: f32,
    /// Angle at or below which a curl-up counts as started
    pub partial_angle: f32,
    /// Minimum tilt of the hip-ankle line away from vertical
    pub min_base_inclination: f32,
    /// Knee angle above which the legs count as straight
    pub max_knee_angle: f32,
    /// How far the ankles may rise above the hips, in normalized units
    pub feet_lift_tolerance: f32,
    pub legs_penalty: u8,
    pub feet_penalty: u8,
    pub range_penalty: u8,
}

impl Default for SitUpThresholds {
    fn default() -> Self {
        Self {
            bands: ScoreBands::default(),
            up_angle: 70.0,
            down_angle: 130.0,
            partial_angle: 100.0,
            min_base_inclination: 45.0,
            max_knee_angle: 120.0,
            feet_lift_tolerance: 0.1,
            legs_penalty: 10,
            feet_penalty: 15,
            range_penalty: 20,
        }
    }
}

impl SitUpThresholds {
    pub(super) fn calibrate(self, _data: &CalibrationData) -> Self {
        // Standing baselines say nothing useful about a floor exercise
        self
    }

    pub fn max_deduction(&self) -> u32 {
        sum(&[self.legs_penalty, self.feet_penalty, self.range_penalty])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpingJackThresholds {
    pub bands: ScoreBands,
    /// Hip-shoulder-wrist angle at or above which the arms are overhead
    pub up_angle: f32,
    /// Hip-shoulder-wrist angle at or below which the arms are down
    pub down_angle: f32,
    pub partial_angle: f32,
    /// Minimum ankle spread at the top, as a multiple of shoulder width
    pub min_leg_spread: f32,
    /// Minimum elbow angle with the arms overhead
    pub min_elbow_angle: f32,
    pub legs_penalty: u8,
    pub arms_penalty: u8,
    pub range_penalty: u8,
}

impl Default for JumpingJackThresholds {
    fn default() -> Self {
        Self {
            bands: ScoreBands::default(),
            up_angle: 140.0,
            down_angle: 40.0,
            partial_angle: 90.0,
            min_leg_spread: 1.2,
            min_elbow_angle: 140.0,
            legs_penalty: 15,
            arms_penalty: 10,
            range_penalty: 20,
        }
    }
}

impl JumpingJackThresholds {
    pub(super) fn calibrate(self, _data: &CalibrationData) -> Self {
        self
    }

    pub fn max_deduction(&self) -> u32 {
        sum(&[self.legs_penalty, self.arms_penalty, self.range_penalty])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BicepCurlThresholds {
    pub bands: ScoreBands,
    /// Elbow angle at or below which the weight is curled
    pub up_angle: f32,
    /// Elbow angle at or above which the arm is extended
    pub down_angle: f32,
    pub partial_angle: f32,
    /// Maximum swing of the upper arm away from vertical
    pub max_elbow_drift: f32,
    /// Maximum lean of the torso away from vertical
    pub max_torso_swing: f32,
    pub drift_penalty: u8,
    pub swing_penalty: u8,
    pub range_penalty: u8,
}

impl Default for BicepCurlThresholds {
    fn default() -> Self {
        Self {
            bands: ScoreBands::default(),
            up_angle: 50.0,
            down_angle: 150.0,
            partial_angle: 90.0,
            max_elbow_drift: 25.0,
            max_torso_swing: 15.0,
            drift_penalty: 15,
            swing_penalty: 15,
            range_penalty: 20,
        }
    }
}

impl BicepCurlThresholds {
    pub(super) fn calibrate(mut self, data: &CalibrationData) -> Self {
        self.down_angle = lower_extension(self.down_angle, self.partial_angle, elbow_baseline(data));
        self
    }

    pub fn max_deduction(&self) -> u32 {
        sum(&[self.drift_penalty, self.swing_penalty, self.range_penalty])
    }
}

fn sum(penalties: &[u8]) -> u32 {
    penalties.iter().map(|p| *p as u32).sum()
}

fn elbow_baseline(data: &CalibrationData) -> Option<f32> {
    data.side_angle(|side: BodySide| JointTriple::new(side.shoulder(), side.elbow(), side.wrist()))
}

fn knee_baseline(data: &CalibrationData) -> Option<f32> {
    data.side_angle(|side: BodySide| JointTriple::new(side.hip(), side.knee(), side.ankle()))
}

/// A subject whose neutral spine reads bent gets that much extra tolerance, up to 10 degrees
fn widen_spine_tolerance(tolerance: f32, data: &CalibrationData) -> f32 {
    match data.side_angle(|side| JointTriple::new(side.shoulder(), side.hip(), side.ankle())) {
        Some(baseline) => tolerance + (180.0 - baseline).clamp(0.0, 10.0),
        None => tolerance,
    }
}

/// Lower an extension threshold for subjects who cannot fully straighten the joint
fn lower_extension(threshold: f32, partial: f32, baseline: Option<f32>) -> f32 {
    match baseline {
        Some(angle) if angle < threshold => (angle - 5.0).max(partial + 5.0).min(threshold),
        _ => threshold,
    }
}

fn scale_knee_tolerance(tolerance: f32, data: &CalibrationData) -> f32 {
    data.proportion(FEMUR_TIBIA_RATIO)
        .map(|ratio| tolerance * ratio.clamp(0.8, 1.5))
        .unwrap_or(tolerance)
}
