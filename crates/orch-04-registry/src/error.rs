//! Registry error types.

use shared_types::ModuleError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Circuit open for module {module_id}, retry in {retry_after_ms}ms")]
    CircuitOpen {
        module_id: String,
        retry_after_ms: u64,
    },

    #[error("Module {module_id} timed out after {timeout_ms}ms")]
    Timeout { module_id: String, timeout_ms: u64 },

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("Invalid registry configuration: {0}")]
    InvalidConfig(String),
}

impl RegistryError {
    /// Whether the failure came from the breaker rather than the module.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }
}
