//! Session orchestration
//!
//! A [`Session`] owns one analyzer and one trust validator for a single
//! subject doing a single exercise. It is synchronous; [`SessionRunner`]
//! drives it from an async frame source.

mod runner;


pub use runner::{FrameSource, SessionInput, SessionRunner, StopReason};

use crate::analyzer::{AnalysisResult, ExerciseAnalyzer};
use crate::calibration::CalibrationStore;
use crate::config::FormguardConfig;
use crate::events::SessionEvent;
use crate::exercise::{ExerciseKind, MistakeCode};
use crate::frame::RawFrame;
use crate::landmark::LandmarkFrame;
use crate::trust::{FrameInspector, Severity, TrustSnapshot, TrustValidator, ValidationResult, ViolationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Everything the live UI needs after one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameFeedback {
    pub analysis: AnalysisResult,
    pub rep_count: u32,
    /// Present only when the live trust score refreshed on this frame
    pub trust: Option<TrustSnapshot>,
}

/// End-of-session performance figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub exercise: ExerciseKind,
    pub rep_count: u32,
    pub average_form_score: f32,
    pub best_form_score: f32,
    pub mistakes: BTreeSet<MistakeCode>,
    pub average_rep_duration_ms: u64,
    pub rep_consistency: f32,
    pub estimated_calories: f32,
    pub scored_frames: usize,
}

impl PerformanceSummary {
    pub fn from_analyzer(analyzer: &ExerciseAnalyzer) -> Self {
        let kind = analyzer.kind();
        Self {
            exercise: kind,
            rep_count: analyzer.rep_count(),
            average_form_score: analyzer.average_form_score(),
            best_form_score: analyzer.best_form_score(),
            mistakes: analyzer.mistakes().clone(),
            average_rep_duration_ms: analyzer.average_rep_duration().as_millis() as u64,
            rep_consistency: analyzer.rep_consistency(),
            estimated_calories: analyzer.rep_count() as f32 * kind.calories_per_rep(),
            scored_frames: analyzer.accumulator().scored_frames(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub subject_id: String,
    pub exercise: ExerciseKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: PerformanceSummary,
    pub validation: ValidationResult,
}

pub struct Session {
    id: Uuid,
    subject_id: String,
    started_at: DateTime<Utc>,
    analyzer: ExerciseAnalyzer,
    validator: TrustValidator,
    pending_events: Vec<SessionEvent>,
    /// Violations already turned into events
    reported_violations: usize,
    last_mistakes: BTreeSet<MistakeCode>,
}

impl Session {
    /// Build both engines and start validation
    pub fn start<S: Into<String>>(
        config: &FormguardConfig,
        subject_id: S,
        exercise: ExerciseKind,
        calibrations: &CalibrationStore,
        inspector: Arc<dyn FrameInspector>,
    ) -> Self {
        let subject_id = subject_id.into();
        let id = Uuid::new_v4();
        let calibration = calibrations.get(&subject_id, exercise);
        if calibration.is_none() {
            debug!("No calibration for {} ({}), using defaults", subject_id, exercise);
        }

        let analyzer = ExerciseAnalyzer::new(exercise, calibration.as_deref(), &config.analyzer);
        let mut validator =
            TrustValidator::initialize(subject_id.clone(), exercise, config.trust.clone(), inspector);
        validator.start_validation();

        info!("Session {} started for {} ({})", id, subject_id, exercise);

        Self {
            pending_events: vec![SessionEvent::SessionStarted {
                session_id: id,
                subject_id: subject_id.clone(),
                exercise,
            }],
            id,
            subject_id,
            started_at: Utc::now(),
            analyzer,
            validator,
            reported_violations: 0,
            last_mistakes: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.analyzer.kind()
    }

    pub fn analyzer(&self) -> &ExerciseAnalyzer {
        &self.analyzer
    }

    pub fn validator(&self) -> &TrustValidator {
        &self.validator
    }

    /// Analyze one landmark frame and, when present, validate its raw frame
    pub fn process(&mut self, frame: &LandmarkFrame, raw: Option<&RawFrame>) -> FrameFeedback {
        let analysis = self.analyzer.analyze(frame);

        if let Some(rep) = analysis.completed_rep {
            self.pending_events.push(SessionEvent::RepCompleted {
                rep_count: analysis.rep_count,
                duration_ms: rep.duration_ms,
                form_score: rep.form_score,
                timestamp_ms: analysis.timestamp_ms,
            });
        }

        if analysis.is_in_position && analysis.mistakes != self.last_mistakes {
            self.last_mistakes = analysis.mistakes.clone();
            self.pending_events.push(SessionEvent::FormFeedback {
                form_score: analysis.form_score,
                mistakes: analysis.mistakes.iter().copied().collect(),
                suggestions: analysis.suggestions.clone(),
                timestamp_ms: analysis.timestamp_ms,
            });
        }

        let trust = raw.and_then(|raw| self.validator.validate_frame(raw));
        self.collect_violations();
        if let Some(snapshot) = trust {
            self.pending_events.push(SessionEvent::TrustUpdated {
                trust_score: snapshot.trust_score,
                violation_count: snapshot.violation_count,
            });
        }

        FrameFeedback {
            rep_count: analysis.rep_count,
            analysis,
            trust,
        }
    }

    /// Pass on a violation detected outside the frame checks
    pub fn record_violation<S: Into<String>>(
        &mut self,
        kind: ViolationKind,
        severity: Severity,
        detail: S,
    ) {
        self.validator.record_violation(kind, severity, detail);
        self.collect_violations();
    }

    fn collect_violations(&mut self) {
        let violations = self.validator.violations();
        for violation in &violations[self.reported_violations.min(violations.len())..] {
            self.pending_events.push(SessionEvent::ViolationRecorded {
                kind: violation.kind,
                severity: violation.severity,
                detail: violation.detail.clone(),
            });
        }
        self.reported_violations = violations.len();
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Stop validation and build the report
    pub fn finish(mut self) -> SessionReport {
        let validation = self.validator.stop_validation();
        let summary = PerformanceSummary::from_analyzer(&self.analyzer);

        info!(
            "Session {} finished: {} reps, average form {:.1}, valid {}",
            self.id, summary.rep_count, summary.average_form_score, validation.is_valid
        );

        SessionReport {
            session_id: self.id,
            subject_id: self.subject_id,
            exercise: summary.exercise,
            started_at: self.started_at,
            finished_at: Utc::now(),
            summary,
            validation,
        }
    }
}
