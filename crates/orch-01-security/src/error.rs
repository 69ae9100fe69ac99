//! Error types for the security engine.
//!
//! Access and rate-limit denials are decisions, not errors; see
//! `AccessDecision` and `RateLimitDecision`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// A policy override carries an unusable value.
    #[error("Invalid policy override: {0}")]
    InvalidOverride(String),

    /// Engine configuration is unusable.
    #[error("Invalid security configuration: {0}")]
    InvalidConfig(String),
}
