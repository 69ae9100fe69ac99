//! `PipelineModule`: wraps module logic in the shared guard steps.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use orch_01_security::{AuditEvent, AuditSeverity, SecurityApi};
use serde_json::json;
use shared_types::{
    Module, ModuleConfig, ModuleError, ModuleResponse, ProcessingContext, SystemTimeSource,
    TimeSource, Timestamp,
};
use tracing::{debug, error, info, warn};

use crate::confidence::{ConfidenceStrategy, LengthHeuristic};
use crate::logic::ModuleLogic;

/// A module idle for longer than this fails its health check.
pub const INACTIVITY_LIMIT_MS: u64 = 60 * 60 * 1_000;

/// Metadata key naming the principal whose data a request touches.
const TARGET_PRINCIPAL_KEY: &str = "target_principal";

const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";
const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded";
const PROCESSING_FAILED: &str = "Processing failed";
const COMMUNICATION_DENIED: &str = "Module communication not allowed";

pub struct PipelineModule<L: ModuleLogic> {
    config: ModuleConfig,
    logic: L,
    security: Arc<dyn SecurityApi>,
    confidence: Box<dyn ConfidenceStrategy>,
    time: Arc<dyn TimeSource>,
    initialized: AtomicBool,
    last_activity: AtomicU64,
}

impl<L: ModuleLogic> PipelineModule<L> {
    pub fn new(config: ModuleConfig, logic: L, security: Arc<dyn SecurityApi>) -> Self {
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let now = time.now();
        Self {
            config,
            logic,
            security,
            confidence: Box::new(LengthHeuristic::default()),
            time,
            initialized: AtomicBool::new(false),
            last_activity: AtomicU64::new(now),
        }
    }

    pub fn with_confidence(mut self, strategy: Box<dyn ConfidenceStrategy>) -> Self {
        self.confidence = strategy;
        self
    }

    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.last_activity.store(time.now(), Ordering::SeqCst);
        self.time = time;
        self
    }

    pub fn module_id(&self) -> &str {
        &self.config.module_id
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn logic(&self) -> &L {
        &self.logic
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity.load(Ordering::SeqCst)
    }

    /// Hand work to a peer module, provided the allow-list permits it.
    pub async fn delegate(
        &self,
        target_id: &str,
        target: &dyn Module,
        input: &str,
        context: ProcessingContext,
    ) -> Result<ModuleResponse, ModuleError> {
        if !self
            .security
            .validate_module_communication(self.module_id(), target_id)
        {
            return Ok(ModuleResponse::failure(COMMUNICATION_DENIED));
        }

        debug!(
            module_id = %self.module_id(),
            target = %target_id,
            "Delegating request to peer module"
        );
        target.process(input, Some(context)).await
    }

    fn default_context(&self) -> ProcessingContext {
        ProcessingContext::new(&self.config.tenant_id, &self.config.principal_id)
    }

    /// Steps 4 to 10. Domain denials are `Ok` responses; `Err` means the
    /// module logic itself failed.
    async fn run_guarded(
        &self,
        input: &str,
        ctx: &ProcessingContext,
    ) -> Result<ModuleResponse, ModuleError> {
        let target_principal = ctx
            .metadata
            .as_ref()
            .and_then(|m| m.get(TARGET_PRINCIPAL_KEY))
            .and_then(|v| v.as_str())
            .unwrap_or(ctx.principal_id.as_str());

        let decision = self.security.validate_access(
            &ctx.principal_id,
            target_principal,
            &ctx.tenant_id,
            &self.config.action,
        );
        if !decision.is_granted() {
            return Ok(ModuleResponse::failure(INSUFFICIENT_PERMISSIONS));
        }

        if !self
            .security
            .check_rate_limit(&ctx.tenant_id, &ctx.principal_id)
            .is_allowed()
        {
            return Ok(ModuleResponse::failure(RATE_LIMIT_EXCEEDED));
        }

        let sanitized = match self.validate_and_sanitize(input) {
            Ok(sanitized) => sanitized,
            Err(reason) => return Ok(ModuleResponse::failure(format!("Invalid input: {}", reason))),
        };

        self.security.log_event(
            AuditEvent::new("module_interaction", AuditSeverity::Low)
                .actor(&ctx.tenant_id, &ctx.principal_id)
                .resource(self.module_id())
                .metadata(json!({
                    "session_id": ctx.session_id,
                    "role": ctx.role,
                    "input_length": sanitized.chars().count(),
                })),
        );

        let output = self.logic.process_request(&sanitized, ctx).await?;

        let data = self
            .security
            .sanitize_output(output.data, &ctx.tenant_id, &ctx.principal_id);
        let confidence = self.confidence.score(&data);

        Ok(ModuleResponse::success(data, confidence)
            .with_suggestions(output.suggestions)
            .with_next_actions(output.next_actions))
    }

    fn validate_and_sanitize(&self, input: &str) -> Result<String, String> {
        if input.trim().is_empty() {
            return Err("input must not be empty".into());
        }
        self.logic.validate_input(input)?;

        let sanitized = self.security.sanitize_input(input);
        if sanitized.is_empty() {
            return Err("input contains no usable content".into());
        }
        Ok(sanitized)
    }

    fn processing_failed(&self, ctx: &ProcessingContext, kind: &str, detail: &str) -> ModuleResponse {
        error!(
            module_id = %self.module_id(),
            tenant_id = %ctx.tenant_id,
            principal_id = %ctx.principal_id,
            kind = %kind,
            detail = %detail,
            "Module processing failed"
        );
        self.security.log_event(
            AuditEvent::new("module_processing_error", AuditSeverity::High)
                .actor(&ctx.tenant_id, &ctx.principal_id)
                .resource(self.module_id())
                .failed()
                .metadata(json!({ "kind": kind })),
        );
        ModuleResponse::failure(PROCESSING_FAILED)
    }
}

#[async_trait]
impl<L: ModuleLogic> Module for PipelineModule<L> {
    async fn initialize(&self) -> Result<(), ModuleError> {
        self.logic
            .initialize_module()
            .await
            .map_err(|e| ModuleError::InitializationFailed {
                module_id: self.config.module_id.clone(),
                reason: e.to_string(),
            })?;

        self.last_activity.store(self.time.now(), Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
        info!(module_id = %self.module_id(), "Module initialized");
        Ok(())
    }

    async fn process(
        &self,
        input: &str,
        context: Option<ProcessingContext>,
    ) -> Result<ModuleResponse, ModuleError> {
        if !self.is_initialized() {
            return Err(ModuleError::NotInitialized {
                module_id: self.config.module_id.clone(),
            });
        }

        self.last_activity.store(self.time.now(), Ordering::SeqCst);
        let ctx = context.unwrap_or_else(|| self.default_context());

        match AssertUnwindSafe(self.run_guarded(input, &ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Ok(self.processing_failed(&ctx, "error", &e.to_string())),
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Ok(self.processing_failed(&ctx, "panic", &detail))
            }
        }
    }

    async fn health_check(&self) -> bool {
        if !self.is_initialized() {
            return false;
        }

        let memory = self.logic.memory_usage_mb();
        if memory > self.config.memory_limit_mb {
            warn!(
                module_id = %self.module_id(),
                memory_mb = memory,
                limit_mb = self.config.memory_limit_mb,
                "Module over memory limit"
            );
            return false;
        }

        let idle = self.time.now().saturating_sub(self.last_activity());
        if idle > INACTIVITY_LIMIT_MS {
            warn!(module_id = %self.module_id(), idle_ms = idle, "Module inactive");
            return false;
        }

        self.logic.perform_health_check().await
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        self.initialized.store(false, Ordering::SeqCst);
        self.logic
            .cleanup_module()
            .await
            .map_err(|e| ModuleError::CleanupFailed {
                module_id: self.config.module_id.clone(),
                reason: e.to_string(),
            })?;
        info!(module_id = %self.module_id(), "Module cleaned up");
        Ok(())
    }

    fn memory_usage_mb(&self) -> f64 {
        self.logic.memory_usage_mb()
    }
}
