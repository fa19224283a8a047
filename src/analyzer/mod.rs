//! Per-frame form scoring and repetition tracking
//!
//! The analyzer dispatches every landmark frame to its exercise rule, drives
//! the idle/up/down state machine from the rule's phase and folds the result
//! into the session accumulator. It never fails: frames it cannot use are
//! reported as out of position.

mod accumulator;
mod state;

#[cfg(test)]
mod tests;

pub use accumulator::PerformanceAccumulator;
pub use state::{ExerciseState, StateTracker, StateTransition, StepOutcome};

use crate::calibration::CalibrationData;
use crate::config::AnalyzerConfig;
use crate::exercise::{Exercise, ExerciseKind, FormGrade, MistakeCode, PosePhase};
use crate::landmark::LandmarkFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

/// Feedback for one landmark frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub timestamp_ms: u64,
    pub form_score: u8,
    pub is_in_position: bool,
    pub mistakes: BTreeSet<MistakeCode>,
    pub suggestions: Vec<String>,
    pub grade: FormGrade,
    pub phase: PosePhase,
    pub state: ExerciseState,
    pub rep_count: u32,
    /// Set on the frame that completed a repetition
    pub completed_rep: Option<CompletedRep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletedRep {
    pub duration_ms: u64,
    /// Mean form score over the repetition
    pub form_score: f32,
}

pub struct ExerciseAnalyzer {
    exercise: Exercise,
    visibility_floor: f32,
    tracker: StateTracker,
    accumulator: PerformanceAccumulator,
    frame_count: u64,
}

impl ExerciseAnalyzer {
    /// Create an analyzer, shifting thresholds by the calibration when present
    pub fn new(
        kind: ExerciseKind,
        calibration: Option<&CalibrationData>,
        config: &AnalyzerConfig,
    ) -> Self {
        let exercise = Exercise::calibrated(kind, calibration);
        debug!(
            "Initializing {} analyzer (calibrated: {}): {:?}",
            kind,
            calibration.is_some(),
            exercise
        );

        Self {
            tracker: StateTracker::new(kind.rest_state(), config.state_history_len),
            exercise,
            visibility_floor: config.visibility_floor,
            accumulator: PerformanceAccumulator::new(),
            frame_count: 0,
        }
    }

    pub fn exercise(&self) -> &Exercise {
        &self.exercise
    }

    pub fn kind(&self) -> ExerciseKind {
        self.exercise.kind()
    }

    /// Score one frame and advance the repetition state
    pub fn analyze(&mut self, frame: &LandmarkFrame) -> AnalysisResult {
        self.frame_count += 1;
        let mut outcome = self.exercise.evaluate(frame, self.visibility_floor);
        let step = self
            .tracker
            .step(outcome.in_position, outcome.phase, frame.timestamp_ms);

        if !outcome.in_position {
            self.accumulator.abandon_rep();
        }

        if step.partial_rep {
            let mistake = self.kind().partial_rep_mistake();
            if !outcome.mistakes.contains(&mistake) {
                outcome.score = outcome
                    .score
                    .saturating_sub(self.exercise.partial_rep_penalty());
                outcome.mistakes.push(mistake);
                outcome.suggestions.push(mistake.suggestion().to_string());
            }
            debug!("Partial {} repetition at {}ms", self.kind(), frame.timestamp_ms);
        }

        let state = self.tracker.state();
        if outcome.in_position && state != ExerciseState::Idle {
            self.accumulator.record_score(outcome.score);
        }
        self.accumulator.record_mistakes(&outcome.mistakes);

        let completed_rep = step.completed_rep_ms.map(|duration_ms| {
            let form_score = self.accumulator.complete_rep(duration_ms);
            info!(
                "{} rep {} completed in {}ms (form {:.0})",
                self.kind(),
                self.accumulator.rep_count(),
                duration_ms,
                form_score
            );
            CompletedRep {
                duration_ms,
                form_score,
            }
        });

        debug!(
            "Frame {} ({}ms): score {}, phase {:?}, state {:?}, in position {}",
            self.frame_count,
            frame.timestamp_ms,
            outcome.score,
            outcome.phase,
            state,
            outcome.in_position
        );

        AnalysisResult {
            timestamp_ms: frame.timestamp_ms,
            grade: self.exercise.grade(outcome.score),
            form_score: outcome.score,
            is_in_position: outcome.in_position,
            mistakes: outcome.mistakes.into_iter().collect(),
            suggestions: outcome.suggestions,
            phase: outcome.phase,
            state,
            rep_count: self.accumulator.rep_count(),
            completed_rep,
        }
    }

    /// Forget all accumulated performance and state history
    pub fn reset(&mut self) {
        debug!("Resetting {} analyzer after {} frames", self.kind(), self.frame_count);
        self.tracker.reset();
        self.accumulator.reset();
        self.frame_count = 0;
    }

    pub fn state(&self) -> ExerciseState {
        self.tracker.state()
    }

    pub fn state_history(&self) -> Vec<StateTransition> {
        self.tracker.history().copied().collect()
    }

    pub fn last_transition_ms(&self) -> Option<u64> {
        self.tracker.last_transition_ms()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn accumulator(&self) -> &PerformanceAccumulator {
        &self.accumulator
    }

    pub fn rep_count(&self) -> u32 {
        self.accumulator.rep_count()
    }

    pub fn average_form_score(&self) -> f32 {
        self.accumulator.average_form_score()
    }

    pub fn best_form_score(&self) -> f32 {
        self.accumulator.best_form_score()
    }

    pub fn mistakes(&self) -> &BTreeSet<MistakeCode> {
        self.accumulator.mistakes()
    }

    pub fn average_rep_duration(&self) -> Duration {
        self.accumulator.average_rep_duration()
    }

    pub fn rep_consistency(&self) -> f32 {
        self.accumulator.rep_consistency()
    }
}
