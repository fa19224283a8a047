use crate::exercise::PosePhase;
use crate::ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Repetition state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseState {
    Idle,
    Up,
    Down,
}

impl ExerciseState {
    fn from_phase(phase: PosePhase) -> Option<Self> {
        match phase {
            PosePhase::Up => Some(ExerciseState::Up),
            PosePhase::Down => Some(ExerciseState::Down),
            PosePhase::Partial | PosePhase::Transition => None,
        }
    }
}

/// One recorded state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: ExerciseState,
    pub to: ExerciseState,
    pub timestamp_ms: u64,
}

/// What a single frame did to the state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Duration of the repetition this frame completed
    pub completed_rep_ms: Option<u64>,
    /// The frame returned to rest without reaching the far end of the movement
    pub partial_rep: bool,
}

/// Tracks idle/up/down and the repetition in progress
#[derive(Debug, Clone)]
pub struct StateTracker {
    state: ExerciseState,
    rest: ExerciseState,
    history: RingBuffer<StateTransition>,
    /// When the current down phase began
    down_started_ms: Option<u64>,
    /// Left the rest position far enough to count as an attempted repetition
    attempt_pending: bool,
}

impl StateTracker {
    /// `rest` is the end of the movement a subject waits in between repetitions
    pub fn new(rest: ExerciseState, history_len: usize) -> Self {
        Self {
            state: ExerciseState::Idle,
            rest,
            history: RingBuffer::new(history_len),
            down_started_ms: None,
            attempt_pending: false,
        }
    }

    pub fn state(&self) -> ExerciseState {
        self.state
    }

    pub fn last_transition_ms(&self) -> Option<u64> {
        self.history.latest().map(|transition| transition.timestamp_ms)
    }

    /// Recent transitions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &StateTransition> + '_ {
        self.history.iter()
    }

    /// Advance by one frame. `phase` is ignored when the subject is out of position.
    pub fn step(&mut self, in_position: bool, phase: PosePhase, timestamp_ms: u64) -> StepOutcome {
        let mut outcome = StepOutcome::default();

        if !in_position {
            self.attempt_pending = false;
            self.down_started_ms = None;
            self.transition(ExerciseState::Idle, timestamp_ms);
            return outcome;
        }

        let Some(target) = ExerciseState::from_phase(phase) else {
            if phase == PosePhase::Partial && self.state == self.rest {
                self.attempt_pending = true;
            }
            return outcome;
        };

        if target == self.rest && self.state == self.rest && self.attempt_pending {
            outcome.partial_rep = true;
        }
        // Reaching either end settles any attempt in progress
        self.attempt_pending = false;

        match (self.state, target) {
            (ExerciseState::Down, ExerciseState::Up) => {
                if let Some(started) = self.down_started_ms.take() {
                    outcome.completed_rep_ms = Some(timestamp_ms.saturating_sub(started));
                }
            }
            (from, ExerciseState::Down) if from != ExerciseState::Down => {
                self.down_started_ms = Some(timestamp_ms);
            }
            _ => {}
        }

        self.transition(target, timestamp_ms);
        outcome
    }

    fn transition(&mut self, to: ExerciseState, timestamp_ms: u64) {
        if self.state == to {
            return;
        }
        trace!("State {:?} -> {:?} at {}ms", self.state, to, timestamp_ms);
        self.history.push(StateTransition {
            from: self.state,
            to,
            timestamp_ms,
        });
        self.state = to;
    }

    pub fn reset(&mut self) {
        trace!("Clearing {} state transitions", self.history.len());
        self.state = ExerciseState::Idle;
        self.history.clear();
        self.down_started_ms = None;
        self.attempt_pending = false;
    }
}
