use super::inspector::FrameInspector;
use super::violation::{trust_after, Severity, Violation, ViolationKind};
use crate::config::TrustConfig;
use crate::exercise::ExerciseKind;
use crate::frame::RawFrame;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Live trust figures, emitted on the refresh cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSnapshot {
    pub trust_score: u8,
    pub violation_count: usize,
    pub invalidated: bool,
    /// Session time of the refresh, from the first usable sampled frame
    pub session_ms: u64,
}

/// What the validator saw, for auditing a verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationEvidence {
    pub frames_received: u64,
    pub frames_sampled: u64,
    pub checks_run: u64,
    pub checks_skipped: u64,
    pub baseline_fingerprint: Option<String>,
    pub violations_by_severity: BTreeMap<Severity, usize>,
    pub session_span_ms: u64,
}

/// End-of-session verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Share of attempted checks that ran, in 0.1 steps
    pub confidence: f32,
    pub trust_score: u8,
    pub violations: Vec<Violation>,
    pub requires_manual_review: bool,
    pub evidence: ValidationEvidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initialized,
    Running,
    Stopped,
}

/// Samples raw frames and keeps a decaying trust score for one session
pub struct TrustValidator {
    subject_id: String,
    exercise: ExerciseKind,
    config: TrustConfig,
    inspector: Arc<dyn FrameInspector>,
    phase: Phase,

    frames_received: u64,
    frames_sampled: u64,
    /// Sampled frames that were fresh and non-empty
    usable_samples: u64,
    checks_run: u64,
    checks_skipped: u64,

    violations: Vec<Violation>,
    trust_score: u8,
    reported_trust: u8,
    last_refresh_ms: Option<u64>,
    invalidated: bool,

    baseline_fingerprint: Option<String>,
    foreign_fingerprints: BTreeSet<String>,
    previous: Option<RawFrame>,
    first_sample_at: Option<SystemTime>,
    last_sample_at: Option<SystemTime>,
    in_static_streak: bool,

    result: Option<ValidationResult>,
}

impl TrustValidator {
    pub fn initialize<S: Into<String>>(
        subject_id: S,
        exercise: ExerciseKind,
        config: TrustConfig,
        inspector: Arc<dyn FrameInspector>,
    ) -> Self {
        let subject_id = subject_id.into();
        debug!(
            "Initializing trust validator for {} ({}) with config: {:?}",
            subject_id, exercise, config
        );

        Self {
            subject_id,
            exercise,
            config,
            inspector,
            phase: Phase::Initialized,
            frames_received: 0,
            frames_sampled: 0,
            usable_samples: 0,
            checks_run: 0,
            checks_skipped: 0,
            violations: Vec::new(),
            trust_score: 100,
            reported_trust: 100,
            last_refresh_ms: None,
            invalidated: false,
            baseline_fingerprint: None,
            foreign_fingerprints: BTreeSet::new(),
            previous: None,
            first_sample_at: None,
            last_sample_at: None,
            in_static_streak: false,
            result: None,
        }
    }

    /// Begin a fresh validation pass, discarding anything recorded before
    pub fn start_validation(&mut self) {
        info!(
            "Starting trust validation for {} ({})",
            self.subject_id, self.exercise
        );
        self.frames_received = 0;
        self.frames_sampled = 0;
        self.usable_samples = 0;
        self.checks_run = 0;
        self.checks_skipped = 0;
        self.violations.clear();
        self.trust_score = 100;
        self.reported_trust = 100;
        self.last_refresh_ms = None;
        self.invalidated = false;
        self.baseline_fingerprint = None;
        self.foreign_fingerprints.clear();
        self.previous = None;
        self.first_sample_at = None;
        self.last_sample_at = None;
        self.in_static_streak = false;
        self.result = None;
        self.phase = Phase::Running;
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Feed one raw frame; returns a snapshot when the live trust score refreshes
    pub fn validate_frame(&mut self, frame: &RawFrame) -> Option<TrustSnapshot> {
        if self.phase != Phase::Running {
            warn!("Ignoring frame {}: validation not running", frame.id);
            return None;
        }

        self.frames_received += 1;
        if self.frames_received % self.config.sample_interval.max(1) != 0 {
            return None;
        }
        self.frames_sampled += 1;

        if frame.is_empty() {
            debug!("Skipping sampled frame {}: no usable pixels", frame.id);
            self.checks_skipped += 1;
            return None;
        }
        if frame.is_older_than(Duration::from_millis(self.config.max_frame_age_ms)) {
            debug!(
                "Skipping sampled frame {}: {}ms old",
                frame.id,
                frame.age_ms()
            );
            self.checks_skipped += 1;
            return None;
        }

        self.usable_samples += 1;
        let first = *self.first_sample_at.get_or_insert(frame.timestamp);
        let at: DateTime<Utc> = frame.timestamp.into();

        if let Some(last) = self.last_sample_at {
            if frame.timestamp < last {
                let behind = last.duration_since(frame.timestamp).unwrap_or_default();
                self.push_violation(
                    ViolationKind::TimestampRegression,
                    Severity::High,
                    at,
                    format!(
                        "frame {} captured {}ms before the previous sample",
                        frame.id,
                        behind.as_millis()
                    ),
                );
            }
        }
        self.last_sample_at = Some(match self.last_sample_at {
            Some(last) => last.max(frame.timestamp),
            None => frame.timestamp,
        });

        let mut ran_any = self.check_fingerprint(frame, at);

        if let Some(previous) = self.previous.take() {
            ran_any |= self.check_motion(&previous, frame, at);
            ran_any |= self.check_static(&previous, frame, at);
        }
        self.previous = Some(frame.clone());

        if ran_any {
            self.checks_run += 1;
        } else {
            self.checks_skipped += 1;
        }

        let session_ms = frame
            .timestamp
            .duration_since(first)
            .unwrap_or_default()
            .as_millis() as u64;
        self.refresh(session_ms)
    }

    fn check_fingerprint(&mut self, frame: &RawFrame, at: DateTime<Utc>) -> bool {
        let due = match self.baseline_fingerprint {
            None => true,
            Some(_) => self.usable_samples % self.config.fingerprint_recheck_interval.max(1) == 0,
        };
        if !due {
            return false;
        }

        let Some(fingerprint) = self.inspector.compute_fingerprint(frame) else {
            return false;
        };

        match &self.baseline_fingerprint {
            None => {
                debug!("Baseline device fingerprint {}", fingerprint);
                self.baseline_fingerprint = Some(fingerprint);
            }
            Some(baseline) if *baseline != fingerprint => {
                if self.foreign_fingerprints.insert(fingerprint.clone()) {
                    let detail = format!("fingerprint {} differs from baseline {}", fingerprint, baseline);
                    self.push_violation(
                        ViolationKind::FingerprintMismatch,
                        Severity::High,
                        at,
                        detail,
                    );
                }
            }
            Some(_) => {}
        }
        true
    }

    fn check_motion(&mut self, previous: &RawFrame, frame: &RawFrame, at: DateTime<Utc>) -> bool {
        let Some(speed) = self.inspector.estimate_motion(previous, frame) else {
            return false;
        };
        let limit = self.config.human_motion_bound * self.config.speed_violation_multiple;
        if speed > limit {
            self.push_violation(
                ViolationKind::ImpossibleMotion,
                Severity::Medium,
                at,
                format!("motion {:.2}/s exceeds limit {:.2}/s", speed, limit),
            );
        }
        true
    }

    fn check_static(&mut self, previous: &RawFrame, frame: &RawFrame, at: DateTime<Utc>) -> bool {
        if self.usable_samples <= self.config.static_grace_samples {
            return false;
        }
        match self.inspector.is_frame_static(previous, frame) {
            Some(true) => {
                if !self.in_static_streak {
                    self.in_static_streak = true;
                    self.push_violation(
                        ViolationKind::StaticFrames,
                        Severity::Low,
                        at,
                        format!("frame {} identical to previous sample", frame.id),
                    );
                }
                true
            }
            Some(false) => {
                self.in_static_streak = false;
                true
            }
            None => false,
        }
    }

    /// Report a violation found outside the sampled-frame checks
    pub fn record_violation<S: Into<String>>(
        &mut self,
        kind: ViolationKind,
        severity: Severity,
        detail: S,
    ) {
        if self.phase != Phase::Running {
            warn!("Ignoring {} violation: validation not running", kind);
            return;
        }
        self.push_violation(kind, severity, Utc::now(), detail.into());
    }

    fn push_violation(
        &mut self,
        kind: ViolationKind,
        severity: Severity,
        timestamp: DateTime<Utc>,
        detail: String,
    ) {
        warn!(
            "Trust violation for {}: {} ({}) {}",
            self.subject_id, kind, severity, detail
        );
        self.trust_score = self.trust_score.saturating_sub(severity.weight());
        if severity == Severity::Critical && !self.invalidated {
            warn!("Session for {} invalidated by {}", self.subject_id, kind);
            self.invalidated = true;
        }
        self.violations.push(Violation {
            kind,
            severity,
            timestamp,
            detail,
        });
    }

    fn refresh(&mut self, session_ms: u64) -> Option<TrustSnapshot> {
        let due = match self.last_refresh_ms {
            None => true,
            Some(last) => session_ms.saturating_sub(last) >= self.config.trust_refresh_interval_ms,
        };
        if !due {
            return None;
        }
        self.last_refresh_ms = Some(session_ms);
        self.reported_trust = trust_after(&self.violations);
        debug!(
            "Trust refreshed at {}ms: {} ({} violations)",
            session_ms,
            self.reported_trust,
            self.violations.len()
        );
        Some(self.snapshot(session_ms))
    }

    fn snapshot(&self, session_ms: u64) -> TrustSnapshot {
        TrustSnapshot {
            trust_score: self.reported_trust,
            violation_count: self.violations.len(),
            invalidated: self.invalidated,
            session_ms,
        }
    }

    /// Last refreshed trust score
    pub fn trust_score(&self) -> u8 {
        self.reported_trust
    }

    /// Trust score including violations not yet refreshed
    pub fn current_trust_score(&self) -> u8 {
        self.trust_score
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn checks_run(&self) -> u64 {
        self.checks_run
    }

    pub fn checks_skipped(&self) -> u64 {
        self.checks_skipped
    }

    /// Finish the pass and produce the verdict; later calls return the same verdict
    pub fn stop_validation(&mut self) -> ValidationResult {
        if let Some(result) = &self.result {
            debug!("Validation already stopped, returning cached result");
            return result.clone();
        }

        let trust_score = trust_after(&self.violations);
        let confidence = self.confidence();
        let is_valid = !self.invalidated && trust_score >= self.config.min_trust_score;
        let borderline = is_valid
            && (trust_score as u16)
                < self.config.min_trust_score as u16 + self.config.review_margin as u16;
        // A verdict without a single completed check always goes to a human
        let requires_manual_review = borderline
            || self.checks_run == 0
            || confidence < self.config.low_confidence_threshold;

        let mut violations_by_severity = BTreeMap::new();
        for violation in &self.violations {
            *violations_by_severity.entry(violation.severity).or_insert(0) += 1;
        }

        let session_span_ms = match (self.first_sample_at, self.last_sample_at) {
            (Some(first), Some(last)) => last
                .duration_since(first)
                .unwrap_or_default()
                .as_millis() as u64,
            _ => 0,
        };

        let result = ValidationResult {
            is_valid,
            confidence,
            trust_score,
            violations: self.violations.clone(),
            requires_manual_review,
            evidence: ValidationEvidence {
                frames_received: self.frames_received,
                frames_sampled: self.frames_sampled,
                checks_run: self.checks_run,
                checks_skipped: self.checks_skipped,
                baseline_fingerprint: self.baseline_fingerprint.clone(),
                violations_by_severity,
                session_span_ms,
            },
        };

        info!(
            "Trust validation for {} finished: valid={}, trust={}, confidence={:.1}, review={}, {} violations",
            self.subject_id,
            result.is_valid,
            result.trust_score,
            result.confidence,
            result.requires_manual_review,
            result.violations.len()
        );

        self.phase = Phase::Stopped;
        self.previous = None;
        self.reported_trust = trust_score;
        self.result = Some(result.clone());
        result
    }

    fn confidence(&self) -> f32 {
        let attempted = self.checks_run + self.checks_skipped;
        if self.checks_run == 0 || attempted == 0 {
            return 0.0;
        }
        let ratio = self.checks_run as f32 / attempted as f32;
        let coverage =
            (self.checks_run as f32 / self.config.min_checks_for_confidence.max(1) as f32).min(1.0);
        ((ratio * coverage * 10.0).floor() / 10.0).clamp(0.0, 1.0)
    }
}
