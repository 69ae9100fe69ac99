//! Test doubles shared by the integration flows.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orch_01_security::{AlertSink, AuditEntry};
use orch_03_module_pipeline::{ModuleLogic, ModuleOutput};
use orch_runtime::{Orchestrator, OrchestratorConfig};
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{
    ManualTimeSource, Module, ModuleError, ModuleResponse, ProcessingContext,
};

pub const TENANT: &str = "acme";
pub const PRINCIPAL: &str = "alice";

/// Clock start for manual-time orchestrators.
pub const T0: u64 = 1_700_000_000_000;

/// A raw `Module` whose behaviour the test flips at runtime.
///
/// Returning `Err` (rather than a failure response) is what the breaker
/// counts, so this bypasses the pipeline on purpose.
#[derive(Default)]
pub struct ScriptedModule {
    calls: AtomicU32,
    failing: AtomicBool,
    unhealthy: AtomicBool,
    panic_on_health: AtomicBool,
    delay_ms: AtomicU64,
}

impl ScriptedModule {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    pub fn set_panic_on_health(&self, panic: bool) {
        self.panic_on_health.store(panic, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Module for ScriptedModule {
    async fn initialize(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn process(
        &self,
        input: &str,
        _context: Option<ProcessingContext>,
    ) -> Result<ModuleResponse, ModuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(ModuleError::processing("backend unavailable"));
        }
        Ok(ModuleResponse::success(Value::String(input.to_string()), 1.0))
    }

    async fn health_check(&self) -> bool {
        if self.panic_on_health.load(Ordering::SeqCst) {
            panic!("health check crashed");
        }
        !self.unhealthy.load(Ordering::SeqCst)
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Pipeline logic that counts invocations and returns a fixed payload.
pub struct CountingLogic {
    calls: Arc<AtomicU32>,
    payload: Value,
}

impl CountingLogic {
    /// The logic plus a handle on its call counter.
    pub fn new(payload: Value) -> (Self, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                payload,
            },
            calls,
        )
    }
}

#[async_trait]
impl ModuleLogic for CountingLogic {
    async fn initialize_module(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn process_request(
        &self,
        _sanitized_input: &str,
        _context: &ProcessingContext,
    ) -> Result<ModuleOutput, ModuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ModuleOutput::new(self.payload.clone()))
    }

    async fn perform_health_check(&self) -> bool {
        true
    }

    async fn cleanup_module(&self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Keeps every alerted entry for inspection.
#[derive(Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<AuditEntry>>,
}

impl RecordingAlertSink {
    pub fn alerts(&self) -> Vec<AuditEntry> {
        self.alerts.lock().clone()
    }
}

impl AlertSink for RecordingAlertSink {
    fn alert(&self, entry: &AuditEntry) {
        self.alerts.lock().push(entry.clone());
    }
}

/// Orchestrator on a manual clock starting at [`T0`].
pub fn manual_orchestrator(
    config: OrchestratorConfig,
) -> (Orchestrator, Arc<ManualTimeSource>, Arc<RecordingAlertSink>) {
    let time = Arc::new(ManualTimeSource::new(T0));
    let alerts = Arc::new(RecordingAlertSink::default());
    let orchestrator = Orchestrator::with_collaborators(config, alerts.clone(), time.clone())
        .expect("default-derived config is valid");
    (orchestrator, time, alerts)
}

pub fn context() -> ProcessingContext {
    ProcessingContext::new(TENANT, PRINCIPAL).with_session("session-it")
}
