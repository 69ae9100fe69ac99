//! Facade-level error type.

use orch_01_security::SecurityError;
use orch_04_registry::RegistryError;
use orch_05_task_router::RouterError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Router(#[from] RouterError),
}

impl OrchestratorError {
    /// True when the router found no rule and no fallback applied.
    pub fn is_unroutable(&self) -> bool {
        matches!(self, Self::Router(RouterError::NoMatchingRule))
    }
}
