//! The module registry and its heartbeat task.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;
use orch_02_circuit_breaker::{BreakerError, CircuitBreaker, CircuitState, CircuitStats};
use parking_lot::Mutex;
use shared_types::{
    Module, ModuleError, ModuleResponse, ModuleState, ModuleStatus, ProcessingContext,
    SystemTimeSource, TimeSource,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::metrics::{HeartbeatReport, RegistryMetrics};

/// Module, status and breaker for one id. Never split.
struct ModuleEntry {
    module: Arc<dyn Module>,
    breaker: CircuitBreaker,
    status: Mutex<ModuleStatus>,
    response_timeout: Duration,
    total_requests: AtomicU64,
    total_failures: AtomicU64,
}

type ModuleMap = DashMap<String, Arc<ModuleEntry>>;

struct Heartbeat {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Registry of capability modules.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct ModuleRegistry {
    modules: Arc<ModuleMap>,
    config: RegistryConfig,
    time: Arc<dyn TimeSource>,
    heartbeat: Mutex<Option<Heartbeat>>,
}

impl ModuleRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        Self::with_time_source(config, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(
        config: RegistryConfig,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, RegistryError> {
        config.validate()?;
        Ok(Self {
            modules: Arc::new(DashMap::new()),
            config,
            time,
            heartbeat: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register with the default response deadline.
    pub async fn register(
        &self,
        module_id: impl Into<String>,
        module: Arc<dyn Module>,
    ) -> Result<(), RegistryError> {
        let timeout = self.config.default_response_timeout();
        self.register_with_timeout(module_id, module, timeout).await
    }

    /// Initialize `module` and take ownership of it under `module_id`.
    ///
    /// An initialization failure leaves the registry untouched.
    pub async fn register_with_timeout(
        &self,
        module_id: impl Into<String>,
        module: Arc<dyn Module>,
        response_timeout: Duration,
    ) -> Result<(), RegistryError> {
        let module_id = module_id.into();
        if self.modules.contains_key(&module_id) {
            return Err(RegistryError::AlreadyRegistered(module_id));
        }

        info!("[Registry] Initializing module: {}", module_id);
        if let Err(e) = module.initialize().await {
            error!(module_id = %module_id, error = %e, "[Registry] Module initialization failed");
            return Err(RegistryError::Module(e));
        }

        let entry = Arc::new(ModuleEntry {
            module: module.clone(),
            breaker: CircuitBreaker::with_time_source(
                module_id.clone(),
                self.config.breaker,
                self.time.clone(),
            ),
            status: Mutex::new(ModuleStatus::active(module_id.clone(), self.time.now())),
            response_timeout,
            total_requests: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
        });

        let inserted = match self.modules.entry(module_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                true
            }
        };

        if !inserted {
            // Lost a race with a concurrent registration of the same id
            if let Err(e) = module.cleanup().await {
                warn!(module_id = %module_id, error = %e, "[Registry] Cleanup of duplicate failed");
            }
            return Err(RegistryError::AlreadyRegistered(module_id));
        }

        info!(
            "[Registry] Registered module: {} (timeout {}ms)",
            module_id,
            response_timeout.as_millis()
        );
        self.ensure_heartbeat();
        Ok(())
    }

    /// Clean up and remove a module with its status and breaker.
    ///
    /// A failing `cleanup()` is logged; the module is removed regardless.
    pub async fn unregister(&self, module_id: &str) -> Result<(), RegistryError> {
        self.remove_module(module_id).await.map(|_| ())
    }

    async fn remove_module(&self, module_id: &str) -> Result<Option<ModuleError>, RegistryError> {
        let entry = self
            .modules
            .get(module_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| RegistryError::ModuleNotFound(module_id.to_string()))?;

        info!("[Registry] Unregistering module: {}", module_id);
        let cleanup_error = match entry.module.cleanup().await {
            Ok(()) => None,
            Err(e) => {
                warn!(module_id = %module_id, error = %e, "[Registry] Module cleanup failed");
                Some(e)
            }
        };

        self.modules.remove(module_id);
        self.stop_heartbeat_if_empty();

        Ok(cleanup_error)
    }

    /// Run one request through the module's breaker and deadline.
    pub async fn process_request(
        &self,
        module_id: &str,
        input: &str,
        context: Option<ProcessingContext>,
    ) -> Result<ModuleResponse, RegistryError> {
        let entry = self
            .modules
            .get(module_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| RegistryError::ModuleNotFound(module_id.to_string()))?;

        entry.total_requests.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let result = entry
            .breaker
            .execute_with_timeout(entry.response_timeout, || {
                entry.module.process(input, context)
            })
            .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let mut status = entry.status.lock();
                status.response_time_ms = elapsed_ms;
                status.last_heartbeat = self.time.now();
                status.error_count = status.error_count.saturating_sub(1);
                if status.error_count == 0 {
                    status.state = ModuleState::Active;
                }
                debug!(
                    module_id = %module_id,
                    elapsed_ms,
                    success = response.success,
                    "[Registry] Request processed"
                );
                Ok(response)
            }
            Err(e) => {
                entry.total_failures.fetch_add(1, Ordering::Relaxed);
                {
                    let mut status = entry.status.lock();
                    status.error_count = status.error_count.saturating_add(1);
                    status.state = ModuleState::Error;
                }

                let err = match e {
                    BreakerError::Open { retry_after_ms } => RegistryError::CircuitOpen {
                        module_id: module_id.to_string(),
                        retry_after_ms,
                    },
                    BreakerError::Timeout(deadline) => RegistryError::Timeout {
                        module_id: module_id.to_string(),
                        timeout_ms: deadline.as_millis() as u64,
                    },
                    BreakerError::Inner(e) => RegistryError::Module(e),
                };
                warn!(module_id = %module_id, error = %err, "[Registry] Request failed");
                Err(err)
            }
        }
    }

    pub fn status(&self, module_id: &str) -> Option<ModuleStatus> {
        self.modules
            .get(module_id)
            .map(|e| e.value().status.lock().clone())
    }

    /// Every status, ordered by module id.
    pub fn all_statuses(&self) -> Vec<ModuleStatus> {
        let mut statuses: Vec<_> = self
            .modules
            .iter()
            .map(|e| e.value().status.lock().clone())
            .collect();
        statuses.sort_by(|a, b| a.module_id.cmp(&b.module_id));
        statuses
    }

    pub fn module_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.modules.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.modules.contains_key(module_id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn metrics(&self) -> RegistryMetrics {
        let mut metrics = RegistryMetrics::default();
        for entry in self.modules.iter() {
            let entry = entry.value();
            metrics.registered += 1;
            match entry.status.lock().state {
                ModuleState::Active => metrics.active += 1,
                ModuleState::Error => metrics.error += 1,
                _ => {}
            }
            metrics.total_requests += entry.total_requests.load(Ordering::Relaxed);
            metrics.total_failures += entry.total_failures.load(Ordering::Relaxed);
            if entry.breaker.state() == CircuitState::Open {
                metrics.open_circuits += 1;
            }
        }
        metrics
    }

    pub fn breaker_stats(&self) -> Vec<CircuitStats> {
        let mut stats: Vec<_> = self
            .modules
            .iter()
            .map(|e| e.value().breaker.stats())
            .collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Close a module's breaker by hand.
    pub fn reset_breaker(&self, module_id: &str) -> Result<(), RegistryError> {
        let entry = self
            .modules
            .get(module_id)
            .ok_or_else(|| RegistryError::ModuleNotFound(module_id.to_string()))?;
        entry.value().breaker.reset();
        Ok(())
    }

    /// One heartbeat tick, on demand.
    pub async fn run_heartbeat(&self) -> HeartbeatReport {
        heartbeat_tick(
            &self.modules,
            self.time.as_ref(),
            self.config.health_check_timeout(),
        )
        .await
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat
            .lock()
            .as_ref()
            .is_some_and(|hb| !hb.handle.is_finished())
    }

    /// Stop the heartbeat and unregister every module.
    ///
    /// Cleanup failures are collected, not fatal.
    pub async fn shutdown(&self) -> Vec<ModuleError> {
        info!("[Registry] Shutting down ({} modules)", self.modules.len());
        self.stop_heartbeat();

        let mut failures = Vec::new();
        for module_id in self.module_ids() {
            match self.remove_module(&module_id).await {
                Ok(Some(e)) => failures.push(e),
                Ok(None) => {}
                // Removed concurrently
                Err(_) => {}
            }
        }
        failures
    }

    fn ensure_heartbeat(&self) {
        let mut heartbeat = self.heartbeat.lock();
        if heartbeat.as_ref().is_some_and(|hb| !hb.handle.is_finished()) {
            return;
        }

        let (stop, mut stop_rx) = watch::channel(false);
        let modules = Arc::clone(&self.modules);
        let time = Arc::clone(&self.time);
        let interval = self.config.heartbeat_interval();
        let check_timeout = self.config.health_check_timeout();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = heartbeat_tick(&modules, time.as_ref(), check_timeout).await;
                        let unhealthy = report.unhealthy();
                        if !unhealthy.is_empty() {
                            warn!(unhealthy = ?unhealthy, "[Registry] Heartbeat found unhealthy modules");
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            debug!("[Registry] Heartbeat task stopped");
        });

        info!(
            "[Registry] Heartbeat started (every {}s)",
            interval.as_secs()
        );
        *heartbeat = Some(Heartbeat { stop, handle });
    }

    fn stop_heartbeat(&self) {
        if let Some(heartbeat) = self.heartbeat.lock().take() {
            let _ = heartbeat.stop.send(true);
            info!("[Registry] Heartbeat stopped");
        }
    }

    /// Emptiness is checked under the heartbeat lock, so a registration
    /// racing this removal either keeps the loop alive or restarts it.
    fn stop_heartbeat_if_empty(&self) {
        let mut heartbeat = self.heartbeat.lock();
        if !self.modules.is_empty() {
            return;
        }
        if let Some(heartbeat) = heartbeat.take() {
            let _ = heartbeat.stop.send(true);
            info!("[Registry] Heartbeat stopped");
        }
    }
}

impl Drop for ModuleRegistry {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.get_mut().take() {
            heartbeat.handle.abort();
        }
    }
}

/// Health-check every module concurrently. A check that errors, panics or
/// misses its deadline marks only its own module unhealthy.
async fn heartbeat_tick(
    modules: &ModuleMap,
    time: &dyn TimeSource,
    check_timeout: Duration,
) -> HeartbeatReport {
    let entries: Vec<(String, Arc<ModuleEntry>)> = modules
        .iter()
        .map(|e| (e.key().clone(), Arc::clone(e.value())))
        .collect();

    let checks = entries.into_iter().map(|(module_id, entry)| async move {
        let healthy = match AssertUnwindSafe(tokio::time::timeout(
            check_timeout,
            entry.module.health_check(),
        ))
        .catch_unwind()
        .await
        {
            Ok(Ok(healthy)) => healthy,
            Ok(Err(_)) => {
                warn!(module_id = %module_id, "[Registry] Health check timed out");
                false
            }
            Err(_) => {
                error!(module_id = %module_id, "[Registry] Health check panicked");
                false
            }
        };

        let memory_mb = std::panic::catch_unwind(AssertUnwindSafe(|| entry.module.memory_usage_mb()))
            .unwrap_or(0.0);

        {
            let mut status = entry.status.lock();
            status.last_heartbeat = time.now();
            status.memory_usage_mb = memory_mb;
            status.state = if healthy {
                ModuleState::Active
            } else {
                ModuleState::Error
            };
        }

        (module_id, healthy)
    });

    let results: BTreeMap<String, bool> = join_all(checks).await.into_iter().collect();
    HeartbeatReport { results }
}
