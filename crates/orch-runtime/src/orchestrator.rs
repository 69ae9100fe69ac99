//! The `Orchestrator` facade.
//!
//! Owns one security engine, one registry and one router, and is the only
//! place they are wired together. Everything is constructed explicitly;
//! share the facade behind an `Arc` if several tasks need it.

use std::sync::Arc;
use std::time::Duration;

use orch_01_security::{
    AlertSink, LoggingAlertSink, PolicyOverrides, SecurityApi, SecurityEngine, SecurityPolicy,
};
use orch_03_module_pipeline::{ModuleLogic, PipelineModule};
use orch_04_registry::{HeartbeatReport, ModuleRegistry, RegistryError, RegistryMetrics};
use orch_05_task_router::{RouteDecision, TaskRouter};
use orch_telemetry::{log_module_event, log_security_event, module_span};
use parking_lot::Mutex;
use serde::Serialize;
use shared_types::{
    Module, ModuleConfig, ModuleError, ModuleResponse, ModuleStatus, ProcessingContext,
    SystemTimeSource, TimeSource,
};
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;

/// Result of [`Orchestrator::dispatch`].
#[derive(Debug, Clone, Serialize)]
pub struct Dispatch {
    pub route: RouteDecision,
    pub response: ModuleResponse,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    security: Arc<SecurityEngine>,
    registry: ModuleRegistry,
    router: TaskRouter,
    time: Arc<dyn TimeSource>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        Self::with_collaborators(config, Arc::new(LoggingAlertSink), Arc::new(SystemTimeSource))
    }

    pub fn with_collaborators(
        config: OrchestratorConfig,
        alert_sink: Arc<dyn AlertSink>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let security = Arc::new(SecurityEngine::with_collaborators(
            config.security.clone(),
            alert_sink,
            Arc::clone(&time),
        )?);
        let registry = ModuleRegistry::with_time_source(config.registry.clone(), Arc::clone(&time))?;
        let router = TaskRouter::from_config(&config.router)?;

        info!(
            rules = router.rules().len(),
            fallback = ?router.fallback_module(),
            "[Orchestrator] Services constructed"
        );

        Ok(Self {
            config,
            security,
            registry,
            router,
            time,
            maintenance: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn security(&self) -> &Arc<SecurityEngine> {
        &self.security
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn router(&self) -> &TaskRouter {
        &self.router
    }

    /// Start the periodic rate-limit sweep. Must be called from within a
    /// tokio runtime; calling it twice is a no-op.
    pub fn start_maintenance(&self) {
        let mut maintenance = self.maintenance.lock();
        if maintenance.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let handle = Arc::clone(&self.security).spawn_rate_limit_cleanup(
            self.config.rate_limit_cleanup_interval(),
            self.config.rate_limit_max_idle(),
        );
        info!(
            "[Orchestrator] Rate limit sweep started (every {}s)",
            self.config.rate_limit_cleanup_interval_secs
        );
        *maintenance = Some(handle);
    }

    /// Wrap `logic` in the execution pipeline and register it under
    /// `config.module_id`.
    pub async fn register_module<L>(
        &self,
        config: ModuleConfig,
        logic: L,
    ) -> Result<(), OrchestratorError>
    where
        L: ModuleLogic + 'static,
    {
        let security: Arc<dyn SecurityApi> = self.security.clone();
        let module = PipelineModule::new(config.clone(), logic, security)
            .with_time_source(Arc::clone(&self.time));
        self.register(config.module_id.clone(), Arc::new(module), &config)
            .await
    }

    /// Register an already-built module, installing the owner's policy
    /// first. A rejected registration leaves the owner's policy as it was.
    pub async fn register(
        &self,
        module_id: impl Into<String>,
        module: Arc<dyn Module>,
        config: &ModuleConfig,
    ) -> Result<(), OrchestratorError> {
        let module_id = module_id.into();
        if self.registry.contains(&module_id) {
            return Err(RegistryError::AlreadyRegistered(module_id).into());
        }

        let previous = self
            .security
            .policy(&config.tenant_id, &config.principal_id);
        self.install_policy(config)?;

        let registered = self
            .registry
            .register_with_timeout(
                module_id.clone(),
                module,
                Duration::from_millis(config.response_timeout_ms),
            )
            .await;
        if let Err(e) = registered {
            self.rollback_policy(config, previous);
            return Err(e.into());
        }

        log_module_event!(
            info,
            module_id,
            "[Orchestrator] Module registered",
            tenant_id = %config.tenant_id,
            principal_id = %config.principal_id
        );
        Ok(())
    }

    /// A module's permissions replace its owner's allowed actions. With no
    /// permissions an existing policy is left alone, otherwise the
    /// baseline is installed.
    fn install_policy(&self, config: &ModuleConfig) -> Result<(), OrchestratorError> {
        if config.permissions.is_empty() {
            if self
                .security
                .policy(&config.tenant_id, &config.principal_id)
                .is_some()
            {
                return Ok(());
            }
            self.security
                .initialize_policy(&config.tenant_id, &config.principal_id, None)?;
        } else {
            let overrides =
                PolicyOverrides::new().allowed_actions(config.permissions.iter().cloned());
            self.security.initialize_policy(
                &config.tenant_id,
                &config.principal_id,
                Some(overrides),
            )?;
        }

        log_security_event!(
            debug,
            config.tenant_id,
            config.principal_id,
            "[Orchestrator] Policy installed for module owner",
            module_id = %config.module_id
        );
        Ok(())
    }

    fn rollback_policy(&self, config: &ModuleConfig, previous: Option<SecurityPolicy>) {
        match previous {
            Some(policy) => {
                self.security
                    .restore_policy(&config.tenant_id, &config.principal_id, policy)
            }
            None => {
                self.security
                    .remove_policy(&config.tenant_id, &config.principal_id);
            }
        }
        log_security_event!(
            debug,
            config.tenant_id,
            config.principal_id,
            "[Orchestrator] Policy rolled back after failed registration",
            module_id = %config.module_id
        );
    }

    pub async fn unregister(&self, module_id: &str) -> Result<(), OrchestratorError> {
        self.registry.unregister(module_id).await?;
        log_module_event!(info, module_id, "[Orchestrator] Module unregistered");
        Ok(())
    }

    /// Send `input` to a specific module.
    pub async fn process(
        &self,
        module_id: &str,
        input: &str,
        context: Option<ProcessingContext>,
    ) -> Result<ModuleResponse, OrchestratorError> {
        self.registry
            .process_request(module_id, input, context)
            .instrument(module_span!("orchestrator.process", module_id = %module_id))
            .await
            .map_err(Into::into)
    }

    /// Id of the module the routing rules pick for `input`. No fallback.
    pub fn route(
        &self,
        input: &str,
        context: Option<&ProcessingContext>,
    ) -> Result<String, OrchestratorError> {
        Ok(self.router.route(input, context)?.target_module)
    }

    /// Route `input` (falling back to the general module when configured)
    /// and process it there.
    pub async fn dispatch(
        &self,
        input: &str,
        context: Option<ProcessingContext>,
    ) -> Result<Dispatch, OrchestratorError> {
        let route = self.router.route_or_fallback(input, context.as_ref())?;
        let response = self.process(&route.target_module, input, context).await?;
        Ok(Dispatch { route, response })
    }

    pub fn status(&self, module_id: &str) -> Option<ModuleStatus> {
        self.registry.status(module_id)
    }

    pub fn all_statuses(&self) -> Vec<ModuleStatus> {
        self.registry.all_statuses()
    }

    pub fn metrics(&self) -> RegistryMetrics {
        self.registry.metrics()
    }

    /// Run one heartbeat round now instead of waiting for the next tick.
    pub async fn run_heartbeat(&self) -> HeartbeatReport {
        self.registry.run_heartbeat().await
    }

    /// Stop background work and unregister every module. Cleanup failures
    /// are returned, not fatal.
    pub async fn shutdown(&self) -> Vec<ModuleError> {
        if let Some(handle) = self.maintenance.lock().take() {
            handle.abort();
        }
        let failures = self.registry.shutdown().await;
        info!(
            cleanup_failures = failures.len(),
            "[Orchestrator] Shutdown complete"
        );
        failures
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if let Some(handle) = self.maintenance.get_mut().take() {
            handle.abort();
        }
    }
}
