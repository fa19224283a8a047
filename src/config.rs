use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FormguardConfig {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub trust: TrustConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Landmarks below this visibility count as missing
    #[serde(default = "default_visibility_floor")]
    pub visibility_floor: f32,

    /// Number of state transitions kept for inspection
    #[serde(default = "default_state_history_len")]
    pub state_history_len: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrustConfig {
    /// Check every Nth received raw frame
    #[serde(default = "default_sample_interval")]
    pub sample_interval: u64,

    /// Lowest trust score a valid session may end with
    #[serde(default = "default_min_trust_score")]
    pub min_trust_score: u8,

    /// Valid sessions this close above the floor are flagged for review
    #[serde(default = "default_review_margin")]
    pub review_margin: u8,

    /// Confidence below this requests manual review
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f32,

    /// Checks needed before confidence can reach its full ratio
    #[serde(default = "default_min_checks_for_confidence")]
    pub min_checks_for_confidence: u64,

    /// Sampled frames before static-frame detection starts
    #[serde(default = "default_static_grace_samples")]
    pub static_grace_samples: u64,

    /// Mean per-second frame change a person can plausibly cause (0-1)
    #[serde(default = "default_human_motion_bound")]
    pub human_motion_bound: f32,

    /// Motion above this multiple of the human bound is a violation
    #[serde(default = "default_speed_violation_multiple")]
    pub speed_violation_multiple: f32,

    /// Recompute the device fingerprint every N sampled frames
    #[serde(default = "default_fingerprint_recheck_interval")]
    pub fingerprint_recheck_interval: u64,

    /// Minimum session time between live trust score refreshes
    #[serde(default = "default_trust_refresh_interval_ms")]
    pub trust_refresh_interval_ms: u64,

    /// Frames older than this on arrival are skipped
    #[serde(default = "default_max_frame_age_ms")]
    pub max_frame_age_ms: u64,

    /// Mean normalized pixel difference below which two frames are identical
    #[serde(default = "default_static_difference_threshold")]
    pub static_difference_threshold: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// Hard stop for a running session
    #[serde(default = "default_max_duration_seconds")]
    pub max_duration_seconds: u64,

    /// Broadcast channel capacity for session events
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Calibration file loaded at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_path: Option<String>,
}

impl FormguardConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("formguard.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "analyzer.visibility_floor",
                default_visibility_floor() as f64,
            )?
            .set_default(
                "analyzer.state_history_len",
                default_state_history_len() as i64,
            )?
            .set_default("trust.sample_interval", default_sample_interval())?
            .set_default("trust.min_trust_score", default_min_trust_score() as i64)?
            .set_default("trust.review_margin", default_review_margin() as i64)?
            .set_default(
                "trust.low_confidence_threshold",
                default_low_confidence_threshold() as f64,
            )?
            .set_default(
                "trust.min_checks_for_confidence",
                default_min_checks_for_confidence(),
            )?
            .set_default("trust.static_grace_samples", default_static_grace_samples())?
            .set_default(
                "trust.human_motion_bound",
                default_human_motion_bound() as f64,
            )?
            .set_default(
                "trust.speed_violation_multiple",
                default_speed_violation_multiple() as f64,
            )?
            .set_default(
                "trust.fingerprint_recheck_interval",
                default_fingerprint_recheck_interval(),
            )?
            .set_default(
                "trust.trust_refresh_interval_ms",
                default_trust_refresh_interval_ms(),
            )?
            .set_default("trust.max_frame_age_ms", default_max_frame_age_ms())?
            .set_default(
                "trust.static_difference_threshold",
                default_static_difference_threshold() as f64,
            )?
            .set_default(
                "session.max_duration_seconds",
                default_max_duration_seconds(),
            )?
            .set_default(
                "session.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // FORMGUARD_TRUST__SAMPLE_INTERVAL=5 style overrides
            .add_source(
                Environment::with_prefix("FORMGUARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: FormguardConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.analyzer.visibility_floor) {
            return Err(ConfigError::Message(
                "Analyzer visibility_floor must be between 0 and 1".to_string(),
            ));
        }

        if self.analyzer.state_history_len == 0 {
            return Err(ConfigError::Message(
                "Analyzer state_history_len must be greater than 0".to_string(),
            ));
        }

        if self.trust.sample_interval == 0 {
            return Err(ConfigError::Message(
                "Trust sample_interval must be greater than 0".to_string(),
            ));
        }

        if self.trust.fingerprint_recheck_interval == 0 {
            return Err(ConfigError::Message(
                "Trust fingerprint_recheck_interval must be greater than 0".to_string(),
            ));
        }

        if self.trust.min_trust_score > 100 {
            return Err(ConfigError::Message(
                "Trust min_trust_score must be at most 100".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.trust.low_confidence_threshold) {
            return Err(ConfigError::Message(
                "Trust low_confidence_threshold must be between 0 and 1".to_string(),
            ));
        }

        if self.trust.human_motion_bound <= 0.0 || self.trust.speed_violation_multiple <= 0.0 {
            return Err(ConfigError::Message(
                "Trust motion bounds must be greater than 0".to_string(),
            ));
        }

        if self.trust.static_difference_threshold < 0.0 {
            return Err(ConfigError::Message(
                "Trust static_difference_threshold must not be negative".to_string(),
            ));
        }

        if self.session.max_duration_seconds == 0 {
            return Err(ConfigError::Message(
                "Session max_duration_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FormguardConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            trust: TrustConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            visibility_floor: default_visibility_floor(),
            state_history_len: default_state_history_len(),
        }
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            min_trust_score: default_min_trust_score(),
            review_margin: default_review_margin(),
            low_confidence_threshold: default_low_confidence_threshold(),
            min_checks_for_confidence: default_min_checks_for_confidence(),
            static_grace_samples: default_static_grace_samples(),
            human_motion_bound: default_human_motion_bound(),
            speed_violation_multiple: default_speed_violation_multiple(),
            fingerprint_recheck_interval: default_fingerprint_recheck_interval(),
            trust_refresh_interval_ms: default_trust_refresh_interval_ms(),
            max_frame_age_ms: default_max_frame_age_ms(),
            static_difference_threshold: default_static_difference_threshold(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration_seconds: default_max_duration_seconds(),
            event_bus_capacity: default_event_bus_capacity(),
            calibration_path: None,
        }
    }
}

// Default value functions
fn default_visibility_floor() -> f32 {
    crate::landmark::DEFAULT_VISIBILITY_FLOOR
}
fn default_state_history_len() -> usize {
    8
}

fn default_sample_interval() -> u64 {
    10
}
fn default_min_trust_score() -> u8 {
    50
}
fn default_review_margin() -> u8 {
    15
}
fn default_low_confidence_threshold() -> f32 {
    0.5
}
fn default_min_checks_for_confidence() -> u64 {
    5
}
fn default_static_grace_samples() -> u64 {
    30
}
fn default_human_motion_bound() -> f32 {
    0.35
}
fn default_speed_violation_multiple() -> f32 {
    3.0
}
fn default_fingerprint_recheck_interval() -> u64 {
    10
}
fn default_trust_refresh_interval_ms() -> u64 {
    5000
}
fn default_max_frame_age_ms() -> u64 {
    2000
}
fn default_static_difference_threshold() -> f32 {
    0.002
}

fn default_max_duration_seconds() -> u64 {
    600
}
fn default_event_bus_capacity() -> usize {
    100
}
