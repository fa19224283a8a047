use super::{Session, SessionReport};
use crate::error::Result;
use crate::events::{EventBus, SessionEvent};
use crate::frame::RawFrame;
use crate::landmark::LandmarkFrame;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One step of input: the landmark frame and, optionally, its camera image
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub landmarks: LandmarkFrame,
    pub raw: Option<RawFrame>,
}

impl SessionInput {
    pub fn landmarks_only(landmarks: LandmarkFrame) -> Self {
        Self {
            landmarks,
            raw: None,
        }
    }
}

/// Anything that yields session inputs in capture order
#[async_trait]
pub trait FrameSource: Send {
    /// Next input, or `None` once the source is exhausted
    async fn next_input(&mut self) -> Result<Option<SessionInput>>;
}

/// Why a runner stopped feeding the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SourceExhausted,
    /// The source returned an error; frames up to it are still reported
    SourceFailed,
    Cancelled,
    /// Wall-clock or capture-time limit reached
    MaxDuration,
}

/// Drives a [`Session`] from a [`FrameSource`] and publishes its events
pub struct SessionRunner {
    session: Session,
    event_bus: EventBus,
    cancellation_token: CancellationToken,
    max_duration: Duration,
}

impl SessionRunner {
    pub fn new(session: Session, event_bus: EventBus, max_duration: Duration) -> Self {
        Self {
            session,
            event_bus,
            cancellation_token: CancellationToken::new(),
            max_duration,
        }
    }

    /// Token that stops the runner when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until the source ends or fails, the token is cancelled or the session times out
    pub async fn run<S: FrameSource + ?Sized>(
        mut self,
        source: &mut S,
    ) -> (SessionReport, StopReason) {
        info!(
            "Running session {} (limit {}s, {} event subscribers)",
            self.session.id(),
            self.max_duration.as_secs(),
            self.event_bus.subscriber_count()
        );
        self.flush_events().await;

        let deadline = tokio::time::Instant::now() + self.max_duration;
        let limit_ms = self.max_duration.as_millis() as u64;
        let mut first_timestamp_ms: Option<u64> = None;
        let mut frames = 0u64;

        let reason = loop {
            let input = tokio::select! {
                _ = self.cancellation_token.cancelled() => {
                    info!("Session {} cancelled", self.session.id());
                    break StopReason::Cancelled;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!("Session {} hit its wall-clock limit", self.session.id());
                    break StopReason::MaxDuration;
                }
                input = source.next_input() => input,
            };

            let input = match input {
                Ok(input) => input,
                Err(e) => {
                    error!(
                        "Frame source failed after {} frames, finishing session {}: {}",
                        frames,
                        self.session.id(),
                        e
                    );
                    break StopReason::SourceFailed;
                }
            };

            let Some(input) = input else {
                debug!("Frame source exhausted after {} frames", frames);
                break StopReason::SourceExhausted;
            };

            let first = *first_timestamp_ms.get_or_insert(input.landmarks.timestamp_ms);
            if input.landmarks.timestamp_ms.saturating_sub(first) > limit_ms {
                warn!(
                    "Session {} reached {}s of capture time",
                    self.session.id(),
                    self.max_duration.as_secs()
                );
                break StopReason::MaxDuration;
            }

            frames += 1;
            self.session.process(&input.landmarks, input.raw.as_ref());
            self.flush_events().await;
        };

        let event_bus = self.event_bus;
        let report = self.session.finish();
        let finished = SessionEvent::SessionFinished {
            session_id: report.session_id,
            rep_count: report.summary.rep_count,
            is_valid: report.validation.is_valid,
        };
        publish(&event_bus, finished).await;

        (report, reason)
    }

    async fn flush_events(&mut self) {
        for event in self.session.drain_events() {
            publish(&self.event_bus, event).await;
        }
    }
}

async fn publish(event_bus: &EventBus, event: SessionEvent) {
    // Nobody listening is normal for offline replays
    if !event_bus.has_subscribers() {
        return;
    }
    if let Err(e) = event_bus.publish(event).await {
        debug!("Event not delivered: {}", e);
    }
}
