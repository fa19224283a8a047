//! Synthetic landmark frames for rule and analyzer tests

use crate::landmark::{Landmark, LandmarkFrame, PoseJoint};

fn put(frame: &mut LandmarkFrame, joint: PoseJoint, x: f32, y: f32) {
    frame.set(joint, Landmark::new(x, y));
}

/// Point at `length` from `origin` in direction `radians` (image axes, y down)
fn offset(origin: (f32, f32), radians: f32, length: f32) -> (f32, f32) {
    (
        origin.0 + length * radians.cos(),
        origin.1 + length * radians.sin(),
    )
}

/// Both sides visible, standing upright with arms hanging straight
pub(crate) fn standing(timestamp_ms: u64) -> LandmarkFrame {
    let mut frame = LandmarkFrame::empty(timestamp_ms);
    put(&mut frame, PoseJoint::Nose, 0.5, 0.15);
    put(&mut frame, PoseJoint::LeftShoulder, 0.4, 0.3);
    put(&mut frame, PoseJoint::RightShoulder, 0.6, 0.3);
    put(&mut frame, PoseJoint::LeftElbow, 0.4, 0.45);
    put(&mut frame, PoseJoint::RightElbow, 0.6, 0.45);
    put(&mut frame, PoseJoint::LeftWrist, 0.4, 0.6);
    put(&mut frame, PoseJoint::RightWrist, 0.6, 0.6);
    put(&mut frame, PoseJoint::LeftHip, 0.42, 0.55);
    put(&mut frame, PoseJoint::RightHip, 0.58, 0.55);
    put(&mut frame, PoseJoint::LeftKnee, 0.42, 0.72);
    put(&mut frame, PoseJoint::RightKnee, 0.58, 0.72);
    put(&mut frame, PoseJoint::LeftAnkle, 0.42, 0.9);
    put(&mut frame, PoseJoint::RightAnkle, 0.58, 0.9);
    put(&mut frame, PoseJoint::LeftFootIndex, 0.45, 0.92);
    put(&mut frame, PoseJoint::RightFootIndex, 0.61, 0.92);
    frame
}

/// Side view plank on the left side. `hip_drop` sags the hips below the body line.
pub(crate) fn push_up(timestamp_ms: u64, elbow_angle: f32, hip_drop: f32) -> LandmarkFrame {
    let mut frame = LandmarkFrame::empty(timestamp_ms);
    put(&mut frame, PoseJoint::LeftShoulder, 0.3, 0.5);
    put(&mut frame, PoseJoint::LeftElbow, 0.3, 0.6);
    // Elbow-to-shoulder points straight up; open the forearm by the requested angle
    let theta = elbow_angle.to_radians();
    put(
        &mut frame,
        PoseJoint::LeftWrist,
        0.3 + 0.1 * theta.sin(),
        0.6 - 0.1 * theta.cos(),
    );
    put(&mut frame, PoseJoint::LeftHip, 0.55, 0.5 + hip_drop);
    put(&mut frame, PoseJoint::LeftAnkle, 0.8, 0.5);
    frame
}

/// Side view squat facing +x. `torso_lean` is degrees away from vertical.
pub(crate) fn squat(timestamp_ms: u64, knee_angle: f32, torso_lean: f32) -> LandmarkFrame {
    let mut frame = LandmarkFrame::empty(timestamp_ms);
    let knee: (f32, f32) = (0.5, 0.65);
    let theta = knee_angle.to_radians();
    let hip = (knee.0 - 0.2 * theta.sin(), knee.1 + 0.2 * theta.cos());
    let lean = torso_lean.to_radians();
    let shoulder = (hip.0 + 0.25 * lean.sin(), hip.1 - 0.25 * lean.cos());
    put(&mut frame, PoseJoint::LeftShoulder, shoulder.0, shoulder.1);
    put(&mut frame, PoseJoint::LeftHip, hip.0, hip.1);
    put(&mut frame, PoseJoint::LeftKnee, knee.0, knee.1);
    put(&mut frame, PoseJoint::LeftAnkle, 0.5, 0.85);
    put(&mut frame, PoseJoint::LeftFootIndex, 0.56, 0.87);
    frame
}

/// Left arm curl. `drift` swings the upper arm forward from vertical, in degrees.
pub(crate) fn curl(timestamp_ms: u64, elbow_angle: f32, drift: f32) -> LandmarkFrame {
    let mut frame = LandmarkFrame::empty(timestamp_ms);
    let shoulder: (f32, f32) = (0.4, 0.3);
    let drift = drift.to_radians();
    let elbow = (shoulder.0 + 0.15 * drift.sin(), shoulder.1 + 0.15 * drift.cos());
    let to_shoulder = (shoulder.1 - elbow.1).atan2(shoulder.0 - elbow.0);
    let wrist = offset(elbow, to_shoulder + elbow_angle.to_radians(), 0.15);
    put(&mut frame, PoseJoint::LeftShoulder, shoulder.0, shoulder.1);
    put(&mut frame, PoseJoint::LeftElbow, elbow.0, elbow.1);
    put(&mut frame, PoseJoint::LeftWrist, wrist.0, wrist.1);
    put(&mut frame, PoseJoint::LeftHip, 0.42, 0.55);
    frame
}

/// Front view jumping jack, either arms-down/feet-together or arms-up/feet-apart
pub(crate) fn jumping_jack(timestamp_ms: u64, arms_up: bool) -> LandmarkFrame {
    let mut frame = LandmarkFrame::empty(timestamp_ms);
    put(&mut frame, PoseJoint::LeftShoulder, 0.4, 0.3);
    put(&mut frame, PoseJoint::RightShoulder, 0.6, 0.3);
    put(&mut frame, PoseJoint::LeftHip, 0.43, 0.55);
    put(&mut frame, PoseJoint::RightHip, 0.57, 0.55);
    if arms_up {
        put(&mut frame, PoseJoint::LeftElbow, 0.375, 0.175);
        put(&mut frame, PoseJoint::RightElbow, 0.625, 0.175);
        put(&mut frame, PoseJoint::LeftWrist, 0.35, 0.05);
        put(&mut frame, PoseJoint::RightWrist, 0.65, 0.05);
        put(&mut frame, PoseJoint::LeftAnkle, 0.3, 0.9);
        put(&mut frame, PoseJoint::RightAnkle, 0.7, 0.9);
    } else {
        put(&mut frame, PoseJoint::LeftElbow, 0.39, 0.45);
        put(&mut frame, PoseJoint::RightElbow, 0.61, 0.45);
        put(&mut frame, PoseJoint::LeftWrist, 0.38, 0.6);
        put(&mut frame, PoseJoint::RightWrist, 0.62, 0.6);
        put(&mut frame, PoseJoint::LeftAnkle, 0.45, 0.9);
        put(&mut frame, PoseJoint::RightAnkle, 0.55, 0.9);
    }
    frame
}

/// Side view sit-up with bent knees; `hip_angle` is shoulder-hip-knee
pub(crate) fn sit_up(timestamp_ms: u64, hip_angle: f32) -> LandmarkFrame {
    let mut frame = LandmarkFrame::empty(timestamp_ms);
    let hip: (f32, f32) = (0.5, 0.7);
    let knee: (f32, f32) = (0.62, 0.6);
    let to_knee = (knee.1 - hip.1).atan2(knee.0 - hip.0);
    let shoulder = offset(hip, to_knee - hip_angle.to_radians(), 0.25);
    put(&mut frame, PoseJoint::LeftShoulder, shoulder.0, shoulder.1);
    put(&mut frame, PoseJoint::LeftHip, hip.0, hip.1);
    put(&mut frame, PoseJoint::LeftKnee, knee.0, knee.1);
    put(&mut frame, PoseJoint::LeftAnkle, 0.72, 0.7);
    frame
}
