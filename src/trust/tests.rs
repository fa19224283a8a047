use super::*;
use crate::config::TrustConfig;
use crate::exercise::ExerciseKind;
use crate::frame::{FrameFormat, RawFrame};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Inspector with scripted answers. Fingerprints come from the device id and
/// frames count as static when their pixels are byte-identical.
struct StubInspector {
    fingerprints: bool,
    motion: Option<f32>,
    static_checks: bool,
    fingerprint_calls: AtomicUsize,
    motion_calls: AtomicUsize,
}

impl StubInspector {
    fn new() -> Self {
        Self {
            fingerprints: true,
            motion: Some(0.1),
            static_checks: true,
            fingerprint_calls: AtomicUsize::new(0),
            motion_calls: AtomicUsize::new(0),
        }
    }

    fn declining() -> Self {
        Self {
            fingerprints: false,
            motion: None,
            static_checks: false,
            ..Self::new()
        }
    }

    fn with_motion(motion: f32) -> Self {
        Self {
            motion: Some(motion),
            ..Self::new()
        }
    }
}

impl FrameInspector for StubInspector {
    fn compute_fingerprint(&self, frame: &RawFrame) -> Option<String> {
        if !self.fingerprints {
            return None;
        }
        self.fingerprint_calls.fetch_add(1, Ordering::SeqCst);
        frame.device_id.clone()
    }

    fn estimate_motion(&self, _previous: &RawFrame, _current: &RawFrame) -> Option<f32> {
        self.motion_calls.fetch_add(1, Ordering::SeqCst);
        self.motion
    }

    fn is_frame_static(&self, previous: &RawFrame, current: &RawFrame) -> Option<bool> {
        if !self.static_checks {
            return None;
        }
        Some(previous.data == current.data)
    }
}

struct Harness {
    base: SystemTime,
}

impl Harness {
    fn new() -> Self {
        Self {
            base: SystemTime::now(),
        }
    }

    /// Frame `id` captured `id * 100ms` after the harness was created
    fn frame(&self, id: u64, fill: u8) -> RawFrame {
        self.frame_at(id, fill, Duration::from_millis(id * 100))
    }

    fn frame_at(&self, id: u64, fill: u8, offset: Duration) -> RawFrame {
        RawFrame::new(id, self.base + offset, vec![fill; 16], 4, 4, FrameFormat::Gray8)
            .with_device_id("camera-0")
    }
}

fn validator(inspector: Arc<StubInspector>, config: TrustConfig) -> TrustValidator {
    let mut validator =
        TrustValidator::initialize("subject-1", ExerciseKind::Squat, config, inspector);
    validator.start_validation();
    validator
}

#[test]
fn test_samples_every_tenth_frame() {
    let inspector = Arc::new(StubInspector::new());
    let mut validator = validator(inspector.clone(), TrustConfig::default());
    let harness = Harness::new();

    for id in 1..=95 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }

    let result = validator.stop_validation();
    assert_eq!(result.evidence.frames_received, 95);
    assert_eq!(result.evidence.frames_sampled, 9);
    assert_eq!(result.evidence.checks_run, 9);
    assert_eq!(result.evidence.checks_skipped, 0);
    // Eight consecutive pairs among nine samples
    assert_eq!(inspector.motion_calls.load(Ordering::SeqCst), 8);
    assert_eq!(result.evidence.baseline_fingerprint.as_deref(), Some("camera-0"));
    assert!(result.is_valid);
    assert_eq!(result.confidence, 1.0);
    assert!(!result.requires_manual_review);
}

#[test]
fn test_frames_before_start_are_ignored() {
    let inspector = Arc::new(StubInspector::new());
    let mut validator = TrustValidator::initialize(
        "subject-1",
        ExerciseKind::PushUp,
        TrustConfig::default(),
        inspector.clone(),
    );
    let harness = Harness::new();

    for id in 1..=20 {
        assert!(validator.validate_frame(&harness.frame(id, 0)).is_none());
    }
    validator.record_violation(ViolationKind::VirtualCamera, Severity::Critical, "early");

    assert_eq!(validator.frames_received(), 0);
    assert!(validator.violations().is_empty());
    assert_eq!(inspector.fingerprint_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_frames_is_valid_but_needs_review() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    let result = validator.stop_validation();

    assert!(result.is_valid);
    assert_eq!(result.confidence, 0.0);
    assert!(result.requires_manual_review);
    assert_eq!(result.trust_score, 100);
    assert!(result.violations.is_empty());
}

#[test]
fn test_zero_frames_needs_review_even_without_confidence_floor() {
    let config = TrustConfig {
        low_confidence_threshold: 0.0,
        ..TrustConfig::default()
    };
    let mut validator = validator(Arc::new(StubInspector::new()), config);
    let result = validator.stop_validation();

    assert!(result.is_valid);
    assert_eq!(result.evidence.checks_run, 0);
    assert!(result.requires_manual_review);
}

#[test]
fn test_second_stop_returns_cached_result() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    let harness = Harness::new();
    for id in 1..=30 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }

    let first = validator.stop_validation();
    // Frames after stop change nothing
    for id in 31..=60 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }
    let second = validator.stop_validation();
    assert_eq!(first, second);
    assert_eq!(second.evidence.frames_received, 30);
}

#[test]
fn test_critical_violation_invalidates_regardless_of_score() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    let harness = Harness::new();
    for id in 1..=60 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }
    validator.record_violation(
        ViolationKind::VirtualCamera,
        Severity::Critical,
        "virtual camera driver detected",
    );
    assert!(validator.is_invalidated());

    let result = validator.stop_validation();
    // 50 is exactly the floor, so the score alone would pass
    assert_eq!(result.trust_score, 50);
    assert!(!result.is_valid);
    assert_eq!(result.evidence.violations_by_severity.get(&Severity::Critical), Some(&1));
}

#[test]
fn test_impossible_motion_is_medium() {
    let mut validator = validator(Arc::new(StubInspector::with_motion(2.0)), TrustConfig::default());
    let harness = Harness::new();
    for id in 1..=30 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }

    let result = validator.stop_validation();
    assert_eq!(result.violations.len(), 2);
    assert!(result
        .violations
        .iter()
        .all(|v| v.kind == ViolationKind::ImpossibleMotion && v.severity == Severity::Medium));
    assert_eq!(result.trust_score, 80);
    assert!(result.is_valid);
}

#[test]
fn test_motion_within_bound_is_fine() {
    // 1.0 per second sits under 3 x 0.35
    let mut validator = validator(Arc::new(StubInspector::with_motion(1.0)), TrustConfig::default());
    let harness = Harness::new();
    for id in 1..=100 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }
    assert!(validator.stop_validation().violations.is_empty());
}

#[test]
fn test_fingerprint_mismatch_recorded_once_per_device() {
    let inspector = Arc::new(StubInspector::new());
    let mut validator = validator(inspector.clone(), TrustConfig::default());
    let harness = Harness::new();

    for id in 1..=200 {
        let mut frame = harness.frame(id, id as u8);
        if id > 50 {
            frame.device_id = Some("camera-1".to_string());
        }
        validator.validate_frame(&frame);
    }

    let result = validator.stop_validation();
    let mismatches: Vec<_> = result
        .violations
        .iter()
        .filter(|v| v.kind == ViolationKind::FingerprintMismatch)
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].severity, Severity::High);
    // Baseline plus rechecks on the 10th and 20th samples
    assert_eq!(inspector.fingerprint_calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.trust_score, 80);
}

#[test]
fn test_static_streak_counts_once() {
    let config = TrustConfig {
        static_grace_samples: 2,
        ..TrustConfig::default()
    };
    let mut validator = validator(Arc::new(StubInspector::new()), config);
    let harness = Harness::new();

    for id in 1..=90 {
        let frozen = (40..=60).contains(&id) || (80..=90).contains(&id);
        let fill = if frozen { 0 } else { id as u8 };
        validator.validate_frame(&harness.frame(id, fill));
    }

    let result = validator.stop_validation();
    let static_hits: Vec<_> = result
        .violations
        .iter()
        .filter(|v| v.kind == ViolationKind::StaticFrames)
        .collect();
    assert_eq!(static_hits.len(), 2);
    assert!(static_hits.iter().all(|v| v.severity == Severity::Low));
    assert_eq!(result.trust_score, 90);
}

#[test]
fn test_static_frames_ignored_during_grace() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    let harness = Harness::new();
    // 25 samples, all identical, all inside the 30-sample grace period
    for id in 1..=250 {
        validator.validate_frame(&harness.frame(id, 7));
    }
    assert!(validator.stop_validation().violations.is_empty());
}

#[test]
fn test_stale_and_empty_frames_are_skipped() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    let harness = Harness::new();

    for id in 1..=20 {
        let stale = RawFrame::new(
            id,
            SystemTime::now() - Duration::from_secs(10),
            vec![0; 16],
            4,
            4,
            FrameFormat::Gray8,
        );
        validator.validate_frame(&stale);
    }
    for id in 21..=30 {
        let empty = RawFrame::new(id, harness.base, Vec::new(), 0, 0, FrameFormat::Gray8);
        validator.validate_frame(&empty);
    }

    let result = validator.stop_validation();
    assert_eq!(result.evidence.checks_skipped, 3);
    assert_eq!(result.evidence.checks_run, 0);
    assert!(result.violations.is_empty());
    assert!(result.is_valid);
    assert_eq!(result.confidence, 0.0);
    assert!(result.requires_manual_review);
}

#[test]
fn test_declined_checks_lower_confidence() {
    let mut validator = validator(Arc::new(StubInspector::declining()), TrustConfig::default());
    let harness = Harness::new();
    for id in 1..=100 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }
    let result = validator.stop_validation();
    assert_eq!(result.evidence.checks_skipped, 10);
    assert_eq!(result.confidence, 0.0);
    assert!(result.requires_manual_review);
}

#[test]
fn test_few_checks_scale_confidence() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    let harness = Harness::new();
    // Four checks against a minimum of five
    for id in 1..=40 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }
    let result = validator.stop_validation();
    assert_eq!(result.evidence.checks_run, 4);
    assert_eq!(result.confidence, 0.8);
    assert!(!result.requires_manual_review);
}

#[test]
fn test_timestamp_regression_is_high() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    let harness = Harness::new();
    for id in 1..=20 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }
    // Sampled frame 30 claims to predate frame 20
    for id in 21..=30 {
        validator.validate_frame(&harness.frame_at(id, id as u8, Duration::from_millis(500)));
    }

    let result = validator.stop_validation();
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].kind, ViolationKind::TimestampRegression);
    assert_eq!(result.violations[0].severity, Severity::High);
}

#[test]
fn test_borderline_trust_requires_review() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    let harness = Harness::new();
    for id in 1..=100 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }
    validator.record_violation(ViolationKind::ScreenReplay, Severity::High, "moire pattern");
    validator.record_violation(ViolationKind::ScreenReplay, Severity::High, "moire pattern");

    let result = validator.stop_validation();
    assert_eq!(result.trust_score, 60);
    assert!(result.is_valid);
    assert_eq!(result.confidence, 1.0);
    assert!(result.requires_manual_review);
}

#[test]
fn test_trust_below_floor_is_invalid() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    for _ in 0..3 {
        validator.record_violation(ViolationKind::ScreenReplay, Severity::High, "replay");
    }
    let result = validator.stop_validation();
    assert_eq!(result.trust_score, 40);
    assert!(!result.is_valid);
    assert!(result.requires_manual_review);
}

#[test]
fn test_live_trust_refreshes_on_cadence() {
    let mut validator = validator(Arc::new(StubInspector::new()), TrustConfig::default());
    let harness = Harness::new();

    let mut refreshes = Vec::new();
    for id in 1..=120 {
        if id == 15 {
            validator.record_violation(ViolationKind::ScreenReplay, Severity::High, "replay");
            // The ledger is updated at once, the reported score waits for the refresh
            assert_eq!(validator.current_trust_score(), 80);
            assert_eq!(validator.trust_score(), 100);
        }
        if let Some(snapshot) = validator.validate_frame(&harness.frame(id, id as u8)) {
            refreshes.push(snapshot);
        }
    }

    // Samples every second of capture time, refreshed every five
    let times: Vec<u64> = refreshes.iter().map(|s| s.session_ms).collect();
    assert_eq!(times, vec![0, 5000, 10000]);
    let scores: Vec<u8> = refreshes.iter().map(|s| s.trust_score).collect();
    assert_eq!(scores, vec![100, 80, 80]);
    assert!(scores.windows(2).all(|pair| pair[1] <= pair[0]));
}

#[test]
fn test_restart_clears_the_ledger() {
    let mut validator = validator(Arc::new(StubInspector::with_motion(5.0)), TrustConfig::default());
    let harness = Harness::new();
    for id in 1..=30 {
        validator.validate_frame(&harness.frame(id, id as u8));
    }
    assert!(!validator.violations().is_empty());

    validator.start_validation();
    assert!(validator.violations().is_empty());
    assert_eq!(validator.trust_score(), 100);
    assert_eq!(validator.frames_received(), 0);
}
