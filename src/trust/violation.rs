use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much a violation costs the trust score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    /// Invalidates the session outright
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Trust points deducted per violation
    pub fn weight(self) -> u8 {
        match self {
            Severity::Low => 5,
            Severity::Medium => 10,
            Severity::High => 20,
            Severity::Critical => 50,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Frames started arriving from a different capture device
    FingerprintMismatch,
    /// Frame-to-frame change faster than a person can move
    ImpossibleMotion,
    /// Consecutive sampled frames are identical
    StaticFrames,
    /// A sampled frame was captured before the previous one
    TimestampRegression,
    /// Capture device reported as a virtual camera
    VirtualCamera,
    /// Frames look like a screen or a replayed video
    ScreenReplay,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::FingerprintMismatch => "fingerprint_mismatch",
            ViolationKind::ImpossibleMotion => "impossible_motion",
            ViolationKind::StaticFrames => "static_frames",
            ViolationKind::TimestampRegression => "timestamp_regression",
            ViolationKind::VirtualCamera => "virtual_camera",
            ViolationKind::ScreenReplay => "screen_replay",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only violation ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub detail: String,
}

/// Trust left after applying every violation, floored at zero
pub fn trust_after(violations: &[Violation]) -> u8 {
    let deducted: u32 = violations.iter().map(|v| v.severity.weight() as u32).sum();
    100u32.saturating_sub(deducted) as u8
}
