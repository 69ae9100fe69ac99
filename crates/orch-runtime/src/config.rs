//! # Orchestrator Configuration
//!
//! One TOML document configures every service:
//!
//! ```toml
//! rate_limit_cleanup_interval_secs = 300
//!
//! [security]
//! audit_capacity = 10000
//!
//! [registry]
//! heartbeat_interval_secs = 30
//!
//! [registry.breaker]
//! failure_threshold = 5
//!
//! [router]
//! fallback_module = "general_assistant"
//! ```
//!
//! Missing sections and keys keep their defaults. Environment variables are
//! applied on top of the file:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `ORCH_CONFIG` | path of the TOML file to load |
//! | `ORCH_HEARTBEAT_INTERVAL_SECS` | `registry.heartbeat_interval_secs` |
//! | `ORCH_DEFAULT_RATE_LIMIT` | `security.default_rate_limit.requests` |
//! | `ORCH_FALLBACK_MODULE` | `router.fallback_module` (empty disables it) |

use std::path::{Path, PathBuf};
use std::time::Duration;

use orch_01_security::SecurityConfig;
use orch_04_registry::RegistryConfig;
use orch_05_task_router::RouterConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "ORCH_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidOverride { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub security: SecurityConfig,
    pub registry: RegistryConfig,
    pub router: RouterConfig,
    /// Seconds between sweeps of idle rate-limit windows
    pub rate_limit_cleanup_interval_secs: u64,
    /// Windows untouched for this long are dropped by the sweep
    pub rate_limit_max_idle_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            security: SecurityConfig::default(),
            registry: RegistryConfig::default(),
            router: RouterConfig::default(),
            rate_limit_cleanup_interval_secs: 300,
            rate_limit_max_idle_secs: 3_600,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// File named by `ORCH_CONFIG` (or defaults), then environment
    /// overrides, then validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ORCH_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ORCH_HEARTBEAT_INTERVAL_SECS") {
            self.registry.heartbeat_interval_secs =
                value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                    key: "ORCH_HEARTBEAT_INTERVAL_SECS",
                    value,
                })?;
        }

        if let Some(value) = lookup("ORCH_DEFAULT_RATE_LIMIT") {
            self.security.default_rate_limit.requests =
                value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                    key: "ORCH_DEFAULT_RATE_LIMIT",
                    value,
                })?;
        }

        if let Some(value) = lookup("ORCH_FALLBACK_MODULE") {
            let value = value.trim();
            self.router.fallback_module = (!value.is_empty()).then(|| value.to_string());
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.security
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.registry
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.router.rules.is_empty() && self.router.fallback_module.is_none() {
            return Err(ConfigError::Invalid(
                "router needs at least one rule or a fallback module".into(),
            ));
        }
        if self.rate_limit_cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit_cleanup_interval_secs cannot be 0".into(),
            ));
        }
        Ok(())
    }

    pub fn rate_limit_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cleanup_interval_secs)
    }

    pub fn rate_limit_max_idle(&self) -> Duration {
        Duration::from_secs(self.rate_limit_max_idle_secs)
    }
}
