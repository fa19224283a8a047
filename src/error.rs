use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormguardError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Unknown exercise: {name}")]
    UnknownExercise { name: String },
}

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Required joint {joint} not visible in calibration frame")]
    JointNotVisible { joint: &'static str },

    #[error("Invalid joint key '{key}'")]
    InvalidJointKey { key: String },
}

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Malformed record at line {line}: {details}")]
    MalformedRecord { line: usize, details: String },

    #[error("Recording contains no frames")]
    Empty,
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

impl FormguardError {
    pub fn unknown_exercise<S: Into<String>>(name: S) -> Self {
        Self::UnknownExercise { name: name.into() }
    }
}

pub type Result<T> = std::result::Result<T, FormguardError>;
