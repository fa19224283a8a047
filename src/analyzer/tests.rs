use super::*;
use crate::calibration::JointTriple;
use crate::exercise::fixtures;
use crate::landmark::{Landmark, PoseJoint};

fn analyzer(kind: ExerciseKind) -> ExerciseAnalyzer {
    ExerciseAnalyzer::new(kind, None, &AnalyzerConfig::default())
}

/// Push-up frames at the given elbow angles, 100ms apart
fn push_ups(angles: &[f32]) -> Vec<LandmarkFrame> {
    angles
        .iter()
        .enumerate()
        .map(|(i, a)| fixtures::push_up(i as u64 * 100, *a, 0.0))
        .collect()
}

#[test]
fn test_rep_counted_exactly_on_down_to_up() {
    let mut analyzer = analyzer(ExerciseKind::PushUp);
    let frames = push_ups(&[175.0, 145.0, 120.0, 80.0, 80.0, 120.0, 145.0, 175.0, 175.0]);

    let counts: Vec<u32> = frames.iter().map(|f| analyzer.analyze(f).rep_count).collect();
    assert_eq!(counts, vec![0, 0, 0, 0, 0, 0, 0, 1, 1]);
    assert_eq!(analyzer.rep_count(), 1);

    // Down began at 300ms, completed at 700ms
    assert_eq!(analyzer.average_rep_duration(), Duration::from_millis(400));
    assert_eq!(analyzer.state(), ExerciseState::Up);
}

#[test]
fn test_completed_rep_is_reported_once() {
    let mut analyzer = analyzer(ExerciseKind::PushUp);
    let results: Vec<_> = push_ups(&[175.0, 80.0, 175.0, 80.0, 175.0])
        .iter()
        .map(|f| analyzer.analyze(f))
        .collect();

    let completed: Vec<_> = results.iter().filter_map(|r| r.completed_rep).collect();
    assert_eq!(completed.len(), 2);
    assert!(completed.iter().all(|rep| rep.duration_ms == 100));
    assert!(completed.iter().all(|rep| rep.form_score == 100.0));
    assert_eq!(analyzer.rep_consistency(), 100.0);
}

#[test]
fn test_replay_after_reset_is_identical() {
    let mut analyzer = analyzer(ExerciseKind::PushUp);
    let mut frames = push_ups(&[175.0, 120.0, 80.0, 175.0, 120.0, 175.0, 80.0, 160.0]);
    frames.push(fixtures::push_up(800, 175.0, 0.1));

    let first: Vec<_> = frames.iter().map(|f| analyzer.analyze(f)).collect();
    let first_summary = (
        analyzer.rep_count(),
        analyzer.average_form_score(),
        analyzer.mistakes().clone(),
    );

    analyzer.reset();
    assert_eq!(analyzer.rep_count(), 0);
    assert!(analyzer.state_history().is_empty());

    let second: Vec<_> = frames.iter().map(|f| analyzer.analyze(f)).collect();
    assert_eq!(first, second);
    assert_eq!(
        first_summary,
        (
            analyzer.rep_count(),
            analyzer.average_form_score(),
            analyzer.mistakes().clone()
        )
    );
}

#[test]
fn test_average_score_is_zero_when_nothing_scored() {
    let mut analyzer = analyzer(ExerciseKind::PushUp);
    assert_eq!(analyzer.average_form_score(), 0.0);

    // Standing is not a push-up position
    let result = analyzer.analyze(&fixtures::standing(0));
    assert!(!result.is_in_position);
    assert_eq!(result.form_score, 0);
    assert!(result.mistakes.is_empty());
    assert_eq!(analyzer.average_form_score(), 0.0);
    assert_eq!(analyzer.accumulator().scored_frames(), 0);
}

#[test]
fn test_average_score_stays_in_range() {
    let mut analyzer = analyzer(ExerciseKind::PushUp);
    for (i, drop) in [0.0, 0.1, 0.2, 0.05].iter().enumerate() {
        analyzer.analyze(&fixtures::push_up(i as u64 * 100, 175.0, *drop));
    }
    let average = analyzer.average_form_score();
    assert!((0.0..=100.0).contains(&average));
    assert!(average < 100.0);
}

#[test]
fn test_sagging_back_scores_85() {
    let mut analyzer = analyzer(ExerciseKind::PushUp);
    let result = analyzer.analyze(&fixtures::push_up(0, 175.0, 0.1));

    assert!(result.is_in_position);
    assert_eq!(result.form_score, 85);
    assert_eq!(
        result.mistakes,
        BTreeSet::from([MistakeCode::BackNotStraight])
    );
    assert_eq!(result.grade, FormGrade::Good);
    assert_eq!(result.suggestions.len(), 1);
    assert!(analyzer.mistakes().contains(&MistakeCode::BackNotStraight));
}

#[test]
fn test_malformed_frames_are_out_of_position() {
    let mut analyzer = analyzer(ExerciseKind::Squat);

    let mut nan_frame = fixtures::squat(0, 170.0, 10.0);
    nan_frame.set(PoseJoint::LeftKnee, Landmark::new(f32::NAN, f32::INFINITY));
    let short = LandmarkFrame::new(100, vec![Landmark::new(0.5, 0.5); 3]);
    let empty = LandmarkFrame::new(200, Vec::new());

    for frame in [&nan_frame, &short, &empty] {
        let result = analyzer.analyze(frame);
        assert!(!result.is_in_position);
        assert_eq!(result.form_score, 0);
        assert_eq!(result.state, ExerciseState::Idle);
    }
}

#[test]
fn test_timestamps_running_backwards_do_not_panic() {
    let mut analyzer = analyzer(ExerciseKind::PushUp);
    analyzer.analyze(&fixtures::push_up(1000, 175.0, 0.0));
    analyzer.analyze(&fixtures::push_up(900, 80.0, 0.0));
    let result = analyzer.analyze(&fixtures::push_up(500, 175.0, 0.0));
    assert_eq!(result.rep_count, 1);
    assert_eq!(result.completed_rep.map(|rep| rep.duration_ms), Some(0));
}

#[test]
fn test_leaving_position_abandons_the_rep() {
    let mut analyzer = analyzer(ExerciseKind::PushUp);
    analyzer.analyze(&fixtures::push_up(0, 175.0, 0.0));
    analyzer.analyze(&fixtures::push_up(100, 80.0, 0.0));
    assert_eq!(analyzer.analyze(&fixtures::standing(200)).state, ExerciseState::Idle);
    let result = analyzer.analyze(&fixtures::push_up(300, 175.0, 0.0));
    assert_eq!(result.rep_count, 0);
}

#[test]
fn test_shallow_squat_reports_insufficient_depth() {
    let mut analyzer = analyzer(ExerciseKind::Squat);
    analyzer.analyze(&fixtures::squat(0, 178.0, 10.0));
    let partial = analyzer.analyze(&fixtures::squat(100, 120.0, 20.0));
    assert!(partial.mistakes.is_empty());

    let back_up = analyzer.analyze(&fixtures::squat(200, 178.0, 10.0));
    assert_eq!(
        back_up.mistakes,
        BTreeSet::from([MistakeCode::InsufficientDepth])
    );
    assert_eq!(back_up.form_score, 80);
    assert_eq!(back_up.rep_count, 0);
    assert!(analyzer.mistakes().contains(&MistakeCode::InsufficientDepth));
}

#[test]
fn test_full_squat_has_no_depth_mistake() {
    let mut analyzer = analyzer(ExerciseKind::Squat);
    for (i, knee) in [178.0, 120.0, 90.0, 120.0, 178.0].iter().enumerate() {
        let result = analyzer.analyze(&fixtures::squat(i as u64 * 250, *knee, 20.0));
        assert!(!result.mistakes.contains(&MistakeCode::InsufficientDepth));
    }
    assert_eq!(analyzer.rep_count(), 1);
    assert_eq!(analyzer.average_rep_duration(), Duration::from_millis(500));
}

#[test]
fn test_bicep_curl_counts_from_arms_down() {
    let mut analyzer = analyzer(ExerciseKind::BicepCurl);
    analyzer.analyze(&fixtures::standing(0));
    analyzer.analyze(&fixtures::curl(400, 40.0, 0.0));
    analyzer.analyze(&fixtures::standing(800));
    let result = analyzer.analyze(&fixtures::curl(1200, 40.0, 0.0));

    assert_eq!(result.rep_count, 2);
    assert_eq!(analyzer.average_rep_duration(), Duration::from_millis(400));
    let transitions: Vec<_> = analyzer.state_history().iter().map(|t| t.to).collect();
    assert_eq!(
        transitions,
        vec![
            ExerciseState::Down,
            ExerciseState::Up,
            ExerciseState::Down,
            ExerciseState::Up
        ]
    );
}

#[test]
fn test_sit_up_rests_lying_down() {
    let mut analyzer = analyzer(ExerciseKind::SitUp);
    let counts: Vec<u32> = [(0, 160.0), (100, 60.0), (200, 160.0), (300, 60.0)]
        .iter()
        .map(|(ts, hip)| analyzer.analyze(&fixtures::sit_up(*ts, *hip)).rep_count)
        .collect();

    assert_eq!(counts, vec![0, 1, 1, 2]);
    assert_eq!(analyzer.average_rep_duration(), Duration::from_millis(100));
}

#[test]
fn test_calibration_lowers_extension_threshold() {
    let calibration = CalibrationData::new("subject-1", ExerciseKind::PushUp).with_angle(
        JointTriple::new(PoseJoint::LeftShoulder, PoseJoint::LeftElbow, PoseJoint::LeftWrist),
        150.0,
    );
    let frames = push_ups(&[150.0, 80.0, 150.0]);

    let mut calibrated =
        ExerciseAnalyzer::new(ExerciseKind::PushUp, Some(&calibration), &AnalyzerConfig::default());
    let mut population = analyzer(ExerciseKind::PushUp);
    for frame in &frames {
        calibrated.analyze(frame);
        population.analyze(frame);
    }

    assert_eq!(calibrated.rep_count(), 1);
    assert_eq!(population.rep_count(), 0);
}
