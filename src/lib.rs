pub mod analyzer;
pub mod calibration;
pub mod config;
pub mod error;
pub mod events;
pub mod exercise;
pub mod frame;
pub mod geometry;
pub mod landmark;
pub mod recording;
pub mod ring_buffer;
pub mod session;
pub mod trust;

pub use analyzer::{AnalysisResult, CompletedRep, ExerciseAnalyzer, ExerciseState};
pub use calibration::{CalibrationData, CalibrationStore, JointPair, JointTriple};
pub use config::FormguardConfig;
pub use error::{FormguardError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, SessionEvent};
pub use exercise::{Exercise, ExerciseKind, FormGrade, MistakeCode, PosePhase};
pub use frame::{FrameFormat, RawFrame};
pub use landmark::{BodySide, Landmark, LandmarkFrame, PoseJoint};
pub use recording::{RecordingFrameSource, SessionRecord};
pub use ring_buffer::RingBuffer;
pub use session::{
    FrameFeedback, FrameSource, PerformanceSummary, Session, SessionInput, SessionReport,
    SessionRunner, StopReason,
};
pub use trust::{
    FrameInspector, Severity, TrustSnapshot, TrustValidator, ValidationResult, Violation,
    ViolationKind,
};

#[cfg(feature = "frame_analysis")]
pub use trust::PixelFrameInspector;
