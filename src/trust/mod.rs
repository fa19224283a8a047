//! Anti-cheat trust validation
//!
//! The validator samples raw camera frames, runs integrity checks through an
//! injected [`FrameInspector`] and keeps an append-only violation ledger. The
//! trust score starts at 100 each session and only ever decreases.

mod inspector;
mod validator;
mod violation;

#[cfg(test)]
mod tests;

pub use inspector::FrameInspector;
#[cfg(feature = "frame_analysis")]
pub use inspector::PixelFrameInspector;
pub use validator::{TrustSnapshot, TrustValidator, ValidationEvidence, ValidationResult};
pub use violation::{trust_after, Severity, Violation, ViolationKind};
