//! The part of a module that differs between modules.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{ModuleError, ProcessingContext};

/// What a module's own logic produces for one request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleOutput {
    pub data: Value,
    pub suggestions: Vec<String>,
    pub next_actions: Vec<String>,
}

impl ModuleOutput {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_next_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.next_actions = actions.into_iter().map(Into::into).collect();
        self
    }
}

impl From<Value> for ModuleOutput {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

/// Implemented by every concrete capability module.
///
/// Input reaching `process_request` has already been authorized,
/// rate-limited and sanitized.
#[async_trait]
pub trait ModuleLogic: Send + Sync {
    async fn initialize_module(&self) -> Result<(), ModuleError>;

    async fn process_request(
        &self,
        sanitized_input: &str,
        context: &ProcessingContext,
    ) -> Result<ModuleOutput, ModuleError>;

    async fn perform_health_check(&self) -> bool;

    async fn cleanup_module(&self) -> Result<(), ModuleError>;

    /// Module-specific input rules, checked before sanitization. The `Err`
    /// text is shown to the caller after `"Invalid input: "`.
    fn validate_input(&self, _input: &str) -> Result<(), String> {
        Ok(())
    }

    fn memory_usage_mb(&self) -> f64 {
        0.0
    }
}
