//! Registry configuration.

use std::time::Duration;

use orch_02_circuit_breaker::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Seconds between heartbeat ticks
    pub heartbeat_interval_secs: u64,
    /// Deadline for a single module health check
    pub health_check_timeout_ms: u64,
    /// Deadline for `process` when the caller does not give one
    pub default_response_timeout_ms: u64,
    /// Thresholds for every module's breaker
    pub breaker: CircuitBreakerConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            health_check_timeout_ms: 5_000,
            default_response_timeout_ms: 30_000,
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl RegistryConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    pub fn default_response_timeout(&self) -> Duration {
        Duration::from_millis(self.default_response_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(RegistryError::InvalidConfig(
                "heartbeat_interval_secs cannot be 0".into(),
            ));
        }
        if self.health_check_timeout_ms == 0 {
            return Err(RegistryError::InvalidConfig(
                "health_check_timeout_ms cannot be 0".into(),
            ));
        }
        if self.default_response_timeout_ms == 0 {
            return Err(RegistryError::InvalidConfig(
                "default_response_timeout_ms cannot be 0".into(),
            ));
        }
        self.breaker.validate().map_err(RegistryError::InvalidConfig)
    }
}
