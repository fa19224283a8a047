//! Per-exercise form rules
//!
//! Each rule is a pure function of one landmark frame and its thresholds. It
//! starts from a perfect score, subtracts a fixed penalty for every violated
//! constraint and classifies the frame into a coarse movement phase from the
//! same joint angles. A rule that cannot find its joints reports the frame as
//! out of position rather than failing.

use super::thresholds::{
    BicepCurlThresholds, JumpingJackThresholds, LungeThresholds, PushUpThresholds,
    SitUpThresholds, SquatThresholds,
};
use super::{MistakeCode, PosePhase};
use crate::geometry::{angle, distance, inclination};
use crate::landmark::{BodySide, Landmark, LandmarkFrame, PoseJoint};

/// What a rule concluded about one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub score: u8,
    pub in_position: bool,
    pub phase: PosePhase,
    pub mistakes: Vec<MistakeCode>,
    pub suggestions: Vec<String>,
}

impl RuleOutcome {
    pub fn out_of_position() -> Self {
        Self {
            score: 0,
            in_position: false,
            phase: PosePhase::Transition,
            mistakes: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

/// Running deduction for one frame
struct ScoreCard {
    deducted: u32,
    mistakes: Vec<MistakeCode>,
}

impl ScoreCard {
    fn new() -> Self {
        Self {
            deducted: 0,
            mistakes: Vec::new(),
        }
    }

    fn penalize(&mut self, mistake: MistakeCode, points: u8) {
        if !self.mistakes.contains(&mistake) {
            self.deducted += points as u32;
            self.mistakes.push(mistake);
        }
    }

    fn finish(self, phase: PosePhase) -> RuleOutcome {
        let score = 100u32.saturating_sub(self.deducted) as u8;
        let suggestions = self
            .mistakes
            .iter()
            .map(|mistake| mistake.suggestion().to_string())
            .collect();
        RuleOutcome {
            score,
            in_position: true,
            phase,
            mistakes: self.mistakes,
            suggestions,
        }
    }
}

/// Look up a fixed set of joints, all of which must be visible
fn locate<const N: usize>(
    frame: &LandmarkFrame,
    joints: [PoseJoint; N],
    floor: f32,
) -> Option<[Landmark; N]> {
    let mut points = [Landmark::hidden(); N];
    for (slot, joint) in points.iter_mut().zip(joints.iter()) {
        *slot = *frame.joint(*joint, floor)?;
    }
    Some(points)
}

/// Pick the fully visible body side with the best mean visibility, left on ties
fn pick_side<const N: usize>(
    frame: &LandmarkFrame,
    floor: f32,
    joints: impl Fn(BodySide) -> [PoseJoint; N],
) -> Option<(BodySide, [Landmark; N])> {
    let mut best: Option<(BodySide, [Landmark; N], f32)> = None;
    for side in [BodySide::Left, BodySide::Right] {
        if let Some(points) = locate(frame, joints(side), floor) {
            let visibility = points.iter().map(|p| p.visibility).sum::<f32>() / N as f32;
            if best.as_ref().map_or(true, |(_, _, b)| visibility > *b) {
                best = Some((side, points, visibility));
            }
        }
    }
    best.map(|(side, points, _)| (side, points))
}

/// Phase for movements whose tracked angle closes on the way down
fn closing_phase(value: f32, up: f32, down: f32, partial: f32) -> PosePhase {
    if value >= up {
        PosePhase::Up
    } else if value <= down {
        PosePhase::Down
    } else if value <= partial {
        PosePhase::Partial
    } else {
        PosePhase::Transition
    }
}

/// Phase for movements whose tracked angle closes on the way up
fn opening_phase(value: f32, up: f32, down: f32, partial: f32) -> PosePhase {
    if value <= up {
        PosePhase::Up
    } else if value >= down {
        PosePhase::Down
    } else if value <= partial {
        PosePhase::Partial
    } else {
        PosePhase::Transition
    }
}

/// Horizontal distance the knee has travelled past the toes, in the facing direction
fn knee_overshoot(knee: &Landmark, ankle: &Landmark, foot: &Landmark) -> f32 {
    let facing = (foot.x - ankle.x).signum();
    (knee.x - foot.x) * facing
}

pub(super) fn push_up(frame: &LandmarkFrame, t: &PushUpThresholds, floor: f32) -> RuleOutcome {
    let Some((_, [shoulder, elbow, wrist, hip, ankle])) = pick_side(frame, floor, |side| {
        [side.shoulder(), side.elbow(), side.wrist(), side.hip(), side.ankle()]
    }) else {
        return RuleOutcome::out_of_position();
    };

    // A plank keeps the shoulder-ankle line far from vertical
    if inclination(&shoulder, &ankle) < t.min_body_inclination {
        return RuleOutcome::out_of_position();
    }

    let elbow_angle = angle(&shoulder, &elbow, &wrist);
    let phase = closing_phase(elbow_angle, t.up_angle, t.down_angle, t.partial_angle);

    let mut card = ScoreCard::new();

    let spine_angle = angle(&shoulder, &hip, &ankle);
    if 180.0 - spine_angle > t.spine_tolerance {
        card.penalize(MistakeCode::BackNotStraight, t.back_penalty);
    }

    // Flare is only measurable when the camera sees both arms
    if let Some([ls, rs, le, re]) = locate(
        frame,
        [
            PoseJoint::LeftShoulder,
            PoseJoint::RightShoulder,
            PoseJoint::LeftElbow,
            PoseJoint::RightElbow,
        ],
        floor,
    ) {
        let shoulder_width = distance(&ls, &rs);
        if shoulder_width > 0.0 && distance(&le, &re) > shoulder_width * t.elbow_flare_ratio {
            card.penalize(MistakeCode::ElbowsFlared, t.flare_penalty);
        }
    }

    card.finish(phase)
}

pub(super) fn squat(frame: &LandmarkFrame, t: &SquatThresholds, floor: f32) -> RuleOutcome {
    let Some((_, [shoulder, hip, knee, ankle, foot])) = pick_side(frame, floor, |side| {
        [side.shoulder(), side.hip(), side.knee(), side.ankle(), side.foot_index()]
    }) else {
        return RuleOutcome::out_of_position();
    };

    if !is_upright(&shoulder, &hip, &knee, &ankle) {
        return RuleOutcome::out_of_position();
    }

    let knee_angle = angle(&hip, &knee, &ankle);
    let phase = closing_phase(knee_angle, t.up_angle, t.down_angle, t.partial_angle);

    let mut card = ScoreCard::new();

    if inclination(&hip, &shoulder) > t.max_torso_lean {
        card.penalize(MistakeCode::TorsoLeaning, t.torso_penalty);
    }

    if knee_overshoot(&knee, &ankle, &foot) > t.knee_toe_tolerance {
        card.penalize(MistakeCode::KneesPastToes, t.knee_toe_penalty);
    }

    // Front view only: side views stack the ankles on top of each other
    if let Some([lk, rk, la, ra]) = locate(
        frame,
        [
            PoseJoint::LeftKnee,
            PoseJoint::RightKnee,
            PoseJoint::LeftAnkle,
            PoseJoint::RightAnkle,
        ],
        floor,
    ) {
        let ankle_spread = (la.x - ra.x).abs();
        let knee_spread = (lk.x - rk.x).abs();
        if ankle_spread > 0.05 && knee_spread < ankle_spread * t.knee_cave_ratio {
            card.penalize(MistakeCode::KneesCaving, t.knee_cave_penalty);
        }
    }

    card.finish(phase)
}

pub(super) fn lunge(frame: &LandmarkFrame, t: &LungeThresholds, floor: f32) -> RuleOutcome {
    // The working leg is the one with the more bent knee
    let mut front: Option<([Landmark; 5], f32)> = None;
    for side in [BodySide::Left, BodySide::Right] {
        if let Some(points) = locate(
            frame,
            [side.shoulder(), side.hip(), side.knee(), side.ankle(), side.foot_index()],
            floor,
        ) {
            let knee_angle = angle(&points[1], &points[2], &points[3]);
            if front.as_ref().map_or(true, |(_, best)| knee_angle < *best) {
                front = Some((points, knee_angle));
            }
        }
    }
    let Some(([shoulder, hip, knee, ankle, foot], knee_angle)) = front else {
        return RuleOutcome::out_of_position();
    };

    if !is_upright(&shoulder, &hip, &knee, &ankle) {
        return RuleOutcome::out_of_position();
    }

    let phase = closing_phase(knee_angle, t.up_angle, t.down_angle, t.partial_angle);

    let mut card = ScoreCard::new();

    if inclination(&hip, &shoulder) > t.max_torso_lean {
        card.penalize(MistakeCode::TorsoLeaning, t.torso_penalty);
    }

    if knee_overshoot(&knee, &ankle, &foot) > t.knee_toe_tolerance {
        card.penalize(MistakeCode::KneesPastToes, t.knee_toe_penalty);
    }

    card.finish(phase)
}

pub(super) fn sit_up(frame: &LandmarkFrame, t: &SitUpThresholds, floor: f32) -> RuleOutcome {
    let Some((_, [shoulder, hip, knee, ankle])) = pick_side(frame, floor, |side| {
        [side.shoulder(), side.hip(), side.knee(), side.ankle()]
    }) else {
        return RuleOutcome::out_of_position();
    };

    // Lying on the floor: the hip-ankle base is closer to horizontal than vertical
    if inclination(&hip, &ankle) < t.min_base_inclination {
        return RuleOutcome::out_of_position();
    }

    let hip_angle = angle(&shoulder, &hip, &knee);
    let phase = opening_phase(hip_angle, t.up_angle, t.down_angle, t.partial_angle);

    let mut card = ScoreCard::new();

    if angle(&hip, &knee, &ankle) > t.max_knee_angle {
        card.penalize(MistakeCode::LegsStraight, t.legs_penalty);
    }

    if hip.y - ankle.y > t.feet_lift_tolerance {
        card.penalize(MistakeCode::FeetLifted, t.feet_penalty);
    }

    card.finish(phase)
}

pub(super) fn jumping_jack(
    frame: &LandmarkFrame,
    t: &JumpingJackThresholds,
    floor: f32,
) -> RuleOutcome {
    let Some([ls, rs, lh, rh, lw, rw, la, ra]) = locate(
        frame,
        [
            PoseJoint::LeftShoulder,
            PoseJoint::RightShoulder,
            PoseJoint::LeftHip,
            PoseJoint::RightHip,
            PoseJoint::LeftWrist,
            PoseJoint::RightWrist,
            PoseJoint::LeftAnkle,
            PoseJoint::RightAnkle,
        ],
        floor,
    ) else {
        return RuleOutcome::out_of_position();
    };

    let shoulder_y = (ls.y + rs.y) / 2.0;
    let hip_y = (lh.y + rh.y) / 2.0;
    let ankle_y = (la.y + ra.y) / 2.0;
    if !(shoulder_y < hip_y && hip_y < ankle_y) {
        return RuleOutcome::out_of_position();
    }

    let arm_angle = (angle(&lh, &ls, &lw) + angle(&rh, &rs, &rw)) / 2.0;
    let phase = if arm_angle >= t.up_angle {
        PosePhase::Up
    } else if arm_angle <= t.down_angle {
        PosePhase::Down
    } else if arm_angle >= t.partial_angle {
        PosePhase::Partial
    } else {
        PosePhase::Transition
    };

    let mut card = ScoreCard::new();

    if phase == PosePhase::Up {
        let shoulder_width = distance(&ls, &rs);
        if shoulder_width > 0.0 && distance(&la, &ra) < shoulder_width * t.min_leg_spread {
            card.penalize(MistakeCode::LegsNotApart, t.legs_penalty);
        }

        if let Some([le, re]) = locate(frame, [PoseJoint::LeftElbow, PoseJoint::RightElbow], floor) {
            let elbow_angle = angle(&ls, &le, &lw).min(angle(&rs, &re, &rw));
            if elbow_angle < t.min_elbow_angle {
                card.penalize(MistakeCode::ArmsBent, t.arms_penalty);
            }
        }
    }

    card.finish(phase)
}

pub(super) fn bicep_curl(
    frame: &LandmarkFrame,
    t: &BicepCurlThresholds,
    floor: f32,
) -> RuleOutcome {
    let Some((_, [shoulder, elbow, wrist, hip])) = pick_side(frame, floor, |side| {
        [side.shoulder(), side.elbow(), side.wrist(), side.hip()]
    }) else {
        return RuleOutcome::out_of_position();
    };

    if shoulder.y >= hip.y || inclination(&hip, &shoulder) >= 45.0 {
        return RuleOutcome::out_of_position();
    }

    let elbow_angle = angle(&shoulder, &elbow, &wrist);
    let phase = opening_phase(elbow_angle, t.up_angle, t.down_angle, t.partial_angle);

    let mut card = ScoreCard::new();

    if inclination(&shoulder, &elbow) > t.max_elbow_drift {
        card.penalize(MistakeCode::ElbowDrift, t.drift_penalty);
    }

    if inclination(&hip, &shoulder) > t.max_torso_swing {
        card.penalize(MistakeCode::TorsoSwing, t.swing_penalty);
    }

    card.finish(phase)
}

/// Standing exercises: shoulders over hips, knees and hips above the ankles
fn is_upright(shoulder: &Landmark, hip: &Landmark, knee: &Landmark, ankle: &Landmark) -> bool {
    shoulder.y < hip.y && hip.y < ankle.y && knee.y < ankle.y && inclination(ankle, shoulder) < 60.0
}
