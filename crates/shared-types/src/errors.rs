//! # Error Types
//!
//! Infrastructure failures raised by modules. Domain outcomes are never
//! represented here; they travel as `ModuleResponse` values.

use thiserror::Error;

/// Errors a module can raise to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// `process` was called before `initialize` succeeded.
    #[error("Module {module_id} is not initialized")]
    NotInitialized { module_id: String },

    /// `initialize` failed; the module must not be registered.
    #[error("Module {module_id} failed to initialize: {reason}")]
    InitializationFailed { module_id: String, reason: String },

    /// Module-specific processing failure.
    #[error("Processing error: {0}")]
    Processing(String),

    /// `cleanup` failed.
    #[error("Module {module_id} failed to clean up: {reason}")]
    CleanupFailed { module_id: String, reason: String },
}

impl ModuleError {
    pub fn processing(details: impl Into<String>) -> Self {
        Self::Processing(details.into())
    }
}
