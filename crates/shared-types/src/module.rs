//! # Module Contract
//!
//! Defines the contract every capability module exposes to the registry,
//! together with its per-module configuration and the status record the
//! registry keeps for it.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use shared_types::{Module, ModuleError, ModuleResponse, ProcessingContext};
//! use async_trait::async_trait;
//!
//! pub struct Echo;
//!
//! #[async_trait]
//! impl Module for Echo {
//!     async fn initialize(&self) -> Result<(), ModuleError> { Ok(()) }
//!     async fn process(
//!         &self,
//!         input: &str,
//!         _context: Option<ProcessingContext>,
//!     ) -> Result<ModuleResponse, ModuleError> {
//!         Ok(ModuleResponse::success(input.into(), 0.8))
//!     }
//!     async fn health_check(&self) -> bool { true }
//!     async fn cleanup(&self) -> Result<(), ModuleError> { Ok(()) }
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::{ModuleResponse, ProcessingContext};
use crate::errors::ModuleError;
use crate::time::Timestamp;

/// The collaborator interface expected of every module.
///
/// Once registered, a module is owned by the registry and only ever called
/// through its circuit breaker.
#[async_trait]
pub trait Module: Send + Sync {
    /// Prepare the module. A failure here aborts registration.
    async fn initialize(&self) -> Result<(), ModuleError>;

    /// Handle one request.
    ///
    /// `Err` is reserved for infrastructure failures and counts against the
    /// module's circuit breaker.
    async fn process(
        &self,
        input: &str,
        context: Option<ProcessingContext>,
    ) -> Result<ModuleResponse, ModuleError>;

    /// Liveness check used by the heartbeat loop.
    async fn health_check(&self) -> bool;

    /// Release resources before unregistration.
    async fn cleanup(&self) -> Result<(), ModuleError>;

    /// Approximate memory footprint reported on each heartbeat.
    fn memory_usage_mb(&self) -> f64 {
        0.0
    }
}

/// Per-module configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub module_id: String,
    /// Tenant the module instance serves.
    pub tenant_id: String,
    /// Principal that owns the module instance.
    pub principal_id: String,
    /// Actions the owning principal's policy grants. Empty keeps the
    /// engine's baseline set.
    pub permissions: Vec<String>,
    /// Health checks fail once usage exceeds this.
    pub memory_limit_mb: f64,
    /// Deadline for a single `process` call.
    pub response_timeout_ms: u64,
    /// Action authorized on every call.
    pub action: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            module_id: String::new(),
            tenant_id: "default".to_string(),
            principal_id: "system".to_string(),
            permissions: Vec::new(),
            memory_limit_mb: 512.0,
            response_timeout_ms: 30_000,
            action: "process".to_string(),
        }
    }
}

impl ModuleConfig {
    pub fn new(
        module_id: impl Into<String>,
        tenant_id: impl Into<String>,
        principal_id: impl Into<String>,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            tenant_id: tenant_id.into(),
            principal_id: principal_id.into(),
            ..Self::default()
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_response_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.response_timeout_ms = timeout_ms;
        self
    }

    pub fn with_memory_limit_mb(mut self, limit: f64) -> Self {
        self.memory_limit_mb = limit;
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }
}

/// Lifecycle state of a registered module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    Initializing,
    Active,
    Error,
    Inactive,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Active => write!(f, "active"),
            Self::Error => write!(f, "error"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// Status record kept by the registry for each module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub module_id: String,
    pub state: ModuleState,
    /// Last successful request or heartbeat, in milliseconds.
    pub last_heartbeat: Timestamp,
    pub error_count: u32,
    pub response_time_ms: u64,
    pub memory_usage_mb: f64,
}

impl ModuleStatus {
    /// Fresh status for a module that just finished initializing.
    pub fn active(module_id: impl Into<String>, now: Timestamp) -> Self {
        Self {
            module_id: module_id.into(),
            state: ModuleState::Active,
            last_heartbeat: now,
            error_count: 0,
            response_time_ms: 0,
            memory_usage_mb: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ModuleState::Active
    }
}
