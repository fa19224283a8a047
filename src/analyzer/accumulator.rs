use crate::exercise::MistakeCode;
use std::collections::BTreeSet;
use std::time::Duration;

/// Session-wide performance figures gathered frame by frame
#[derive(Debug, Clone, Default)]
pub struct PerformanceAccumulator {
    rep_count: u32,
    form_scores: Vec<u8>,
    mistake_tally: BTreeSet<MistakeCode>,
    rep_durations: Vec<u64>,
    /// Mean score of each completed repetition
    rep_scores: Vec<f32>,
    /// Scores of the repetition in progress
    current_rep: Vec<u8>,
}

impl PerformanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_score(&mut self, score: u8) {
        self.form_scores.push(score);
        self.current_rep.push(score);
    }

    pub fn record_mistakes<'a>(&mut self, mistakes: impl IntoIterator<Item = &'a MistakeCode>) {
        self.mistake_tally.extend(mistakes);
    }

    pub fn complete_rep(&mut self, duration_ms: u64) -> f32 {
        self.rep_count += 1;
        self.rep_durations.push(duration_ms);
        let score = mean_u8(&self.current_rep);
        self.rep_scores.push(score);
        self.current_rep.clear();
        score
    }

    /// Forget the scores of an abandoned repetition
    pub fn abandon_rep(&mut self) {
        self.current_rep.clear();
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn scored_frames(&self) -> usize {
        self.form_scores.len()
    }

    pub fn average_form_score(&self) -> f32 {
        mean_u8(&self.form_scores)
    }

    /// Best completed repetition, or the best single frame before any rep completes
    pub fn best_form_score(&self) -> f32 {
        if self.rep_scores.is_empty() {
            return self.form_scores.iter().copied().max().unwrap_or(0) as f32;
        }
        self.rep_scores.iter().copied().fold(0.0, f32::max)
    }

    pub fn mistakes(&self) -> &BTreeSet<MistakeCode> {
        &self.mistake_tally
    }

    pub fn rep_durations(&self) -> &[u64] {
        &self.rep_durations
    }

    pub fn average_rep_duration(&self) -> Duration {
        if self.rep_durations.is_empty() {
            return Duration::ZERO;
        }
        let total: u64 = self.rep_durations.iter().sum();
        Duration::from_millis(total / self.rep_durations.len() as u64)
    }

    /// 100 minus the coefficient of variation of rep durations, in percent
    pub fn rep_consistency(&self) -> f32 {
        rep_consistency(&self.rep_durations)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn mean_u8(values: &[u8]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| *v as f32).sum::<f32>() / values.len() as f32
}

pub(crate) fn rep_consistency(durations: &[u64]) -> f32 {
    if durations.len() < 2 {
        return 100.0;
    }
    let n = durations.len() as f64;
    let mean = durations.iter().map(|d| *d as f64).sum::<f64>() / n;
    if mean <= 0.0 {
        return 100.0;
    }
    let variance = durations
        .iter()
        .map(|d| {
            let delta = *d as f64 - mean;
            delta * delta
        })
        .sum::<f64>()
        / n;
    let cv = variance.sqrt() / mean * 100.0;
    (100.0 - cv).clamp(0.0, 100.0) as f32
}
