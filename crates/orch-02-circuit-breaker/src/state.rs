//! Breaker state and statistics.

use std::fmt;

use serde::Serialize;
use shared_types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, calls pass through
    Closed,
    /// Calls are rejected without running
    Open,
    /// Reset timeout elapsed, a trial call tests the module
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Point-in-time snapshot of one breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitStats {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_at: Option<Timestamp>,
    pub last_transition_at: Timestamp,
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_rejections: u64,
}
