use crate::error::EventBusError;
use crate::exercise::{ExerciseKind, MistakeCode};
use crate::trust::{Severity, ViolationKind};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events emitted while a session runs, for live UI and logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Both engines are ready and validation has started
    SessionStarted {
        session_id: Uuid,
        subject_id: String,
        exercise: ExerciseKind,
    },
    /// A repetition completed on a down-to-up transition
    RepCompleted {
        rep_count: u32,
        duration_ms: u64,
        form_score: f32,
        timestamp_ms: u64,
    },
    /// The set of form mistakes on screen changed
    FormFeedback {
        form_score: u8,
        mistakes: Vec<MistakeCode>,
        suggestions: Vec<String>,
        timestamp_ms: u64,
    },
    /// The live trust score was refreshed
    TrustUpdated {
        trust_score: u8,
        violation_count: usize,
    },
    /// An integrity violation entered the ledger
    ViolationRecorded {
        kind: ViolationKind,
        severity: Severity,
        detail: String,
    },
    /// The session report has been produced
    SessionFinished {
        session_id: Uuid,
        rep_count: u32,
        is_valid: bool,
    },
}

impl SessionEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::SessionStarted {
                subject_id,
                exercise,
                ..
            } => format!("Session started: {} doing {}", subject_id, exercise),
            SessionEvent::RepCompleted {
                rep_count,
                duration_ms,
                form_score,
                ..
            } => format!(
                "Rep {} completed in {}ms (form {:.0})",
                rep_count, duration_ms, form_score
            ),
            SessionEvent::FormFeedback { mistakes, .. } => {
                if mistakes.is_empty() {
                    "Form corrected".to_string()
                } else {
                    let names: Vec<&str> = mistakes.iter().map(|m| m.as_str()).collect();
                    format!("Form feedback: {}", names.join(", "))
                }
            }
            SessionEvent::TrustUpdated {
                trust_score,
                violation_count,
            } => format!(
                "Trust score {} ({} violations)",
                trust_score, violation_count
            ),
            SessionEvent::ViolationRecorded {
                kind,
                severity,
                detail,
            } => format!("{} violation {}: {}", severity, kind, detail),
            SessionEvent::SessionFinished {
                rep_count,
                is_valid,
                ..
            } => format!(
                "Session finished with {} reps ({})",
                rep_count,
                if *is_valid { "valid" } else { "invalid" }
            ),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::SessionStarted { .. } => "session_started",
            SessionEvent::RepCompleted { .. } => "rep_completed",
            SessionEvent::FormFeedback { .. } => "form_feedback",
            SessionEvent::TrustUpdated { .. } => "trust_updated",
            SessionEvent::ViolationRecorded { .. } => "violation_recorded",
            SessionEvent::SessionFinished { .. } => "session_finished",
        }
    }
}

/// Async event bus for session consumers using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let mut bus = Self::new(capacity);
        bus.debug_logging = true;
        bus
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter applied on receive
    pub fn subscribe_filtered<S: Into<String>>(&self, name: S, filter: EventFilter) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.into())
    }

    /// Publish an event to all subscribers
    pub async fn publish(&self, event: SessionEvent) -> Result<usize, EventBusError> {
        match &event {
            SessionEvent::SessionStarted { .. } | SessionEvent::SessionFinished { .. } => {
                info!("{}", event.description());
            }
            SessionEvent::ViolationRecorded { .. } => {
                warn!("{}", event.description());
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &SessionEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<SessionEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<SessionEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<SessionEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Log every matching event until the bus closes; returns how many were logged
    pub async fn log_until_closed(mut self) -> usize {
        let mut logged = 0;
        loop {
            match self.recv().await {
                Ok(event) => {
                    info!("[{}] {}", self.name, event.description());
                    logged += 1;
                }
                Err(EventBusError::ChannelClosed) => break,
                // Lag is already reported by recv; keep following the live stream
                Err(_) => continue,
            }
        }
        logged
    }
}
