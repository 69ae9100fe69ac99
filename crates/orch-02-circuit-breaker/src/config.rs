//! Breaker configuration.

use serde::{Deserialize, Serialize};

/// Thresholds shared by every breaker the registry creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Time after the last failure before a trial call is let through
    pub reset_timeout_ms: u64,
    /// A failure this long after the previous one starts a fresh count
    pub monitoring_window_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
            monitoring_window_ms: 300_000,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold cannot be 0".into());
        }
        if self.monitoring_window_ms == 0 {
            return Err("monitoring_window_ms cannot be 0".into());
        }
        Ok(())
    }
}
