//! # Failure Isolation Flows
//!
//! A module that keeps failing is cut off by its own breaker while its
//! neighbours keep serving:
//!
//! 1. **Trip**: five consecutive errors open the circuit; the sixth call is
//!    rejected without reaching the module.
//! 2. **Recover**: after the reset timeout one trial call decides between
//!    closing and re-opening.
//! 3. **Deadline**: a call that outlives its response timeout counts as a
//!    failure.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use orch_02_circuit_breaker::{CircuitState, CircuitStats};
    use orch_04_registry::RegistryError;
    use orch_runtime::{Orchestrator, OrchestratorConfig, OrchestratorError};
    use shared_types::{ModuleConfig, ModuleError, ModuleState};

    use crate::integration::fixtures::{
        context, manual_orchestrator, ScriptedModule, PRINCIPAL, T0, TENANT,
    };

    fn module_config(module_id: &str) -> ModuleConfig {
        ModuleConfig::new(module_id, TENANT, PRINCIPAL)
    }

    fn breaker(orchestrator: &Orchestrator, module_id: &str) -> CircuitStats {
        orchestrator
            .registry()
            .breaker_stats()
            .into_iter()
            .find(|s| s.name == module_id)
            .expect("breaker exists for registered module")
    }

    async fn fail_times(orchestrator: &Orchestrator, module_id: &str, n: usize) {
        for _ in 0..n {
            let err = orchestrator
                .process(module_id, "pull the numbers", Some(context()))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                OrchestratorError::Registry(RegistryError::Module(ModuleError::Processing(_)))
            ));
        }
    }

    #[tokio::test]
    async fn test_five_failures_open_circuit_and_sixth_is_rejected() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let module = ScriptedModule::new();
        module.set_failing(true);
        orchestrator
            .register("analytics_ai", module.clone(), &module_config("analytics_ai"))
            .await
            .unwrap();

        fail_times(&orchestrator, "analytics_ai", 5).await;
        assert_eq!(breaker(&orchestrator, "analytics_ai").state, CircuitState::Open);

        let err = orchestrator
            .process("analytics_ai", "pull the numbers", Some(context()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Registry(RegistryError::CircuitOpen { ref module_id, .. })
                if module_id == "analytics_ai"
        ));
        assert_eq!(module.calls(), 5, "open circuit must not reach the module");

        let status = orchestrator.status("analytics_ai").unwrap();
        assert_eq!(status.state, ModuleState::Error);
        assert_eq!(status.error_count, 6);
        assert_eq!(orchestrator.metrics().open_circuits, 1);
    }

    #[tokio::test]
    async fn test_open_circuit_isolates_only_its_module() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let broken = ScriptedModule::new();
        broken.set_failing(true);
        let healthy = ScriptedModule::new();
        orchestrator
            .register("analytics_ai", broken, &module_config("analytics_ai"))
            .await
            .unwrap();
        orchestrator
            .register("dialer_ai", healthy.clone(), &module_config("dialer_ai"))
            .await
            .unwrap();

        fail_times(&orchestrator, "analytics_ai", 5).await;

        let response = orchestrator
            .process("dialer_ai", "call bob", Some(context()))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(healthy.calls(), 1);
        assert_eq!(breaker(&orchestrator, "dialer_ai").state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_trial_success_after_reset_timeout_closes_circuit() {
        let (orchestrator, time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let module = ScriptedModule::new();
        module.set_failing(true);
        orchestrator
            .register("analytics_ai", module.clone(), &module_config("analytics_ai"))
            .await
            .unwrap();
        fail_times(&orchestrator, "analytics_ai", 5).await;

        // Still inside the reset timeout
        time.advance(30_000);
        let err = orchestrator
            .process("analytics_ai", "retry", Some(context()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Registry(RegistryError::CircuitOpen {
                retry_after_ms: 30_000,
                ..
            })
        ));
        assert_eq!(module.calls(), 5);

        time.advance(30_001);
        module.set_failing(false);
        let response = orchestrator
            .process("analytics_ai", "retry", Some(context()))
            .await
            .unwrap();
        assert!(response.success);

        let stats = breaker(&orchestrator, "analytics_ai");
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 0);
        assert_eq!(module.calls(), 6);
    }

    #[tokio::test]
    async fn test_trial_failure_reopens_with_fresh_failure_time() {
        let (orchestrator, time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let module = ScriptedModule::new();
        module.set_failing(true);
        orchestrator
            .register("analytics_ai", module.clone(), &module_config("analytics_ai"))
            .await
            .unwrap();
        fail_times(&orchestrator, "analytics_ai", 5).await;
        assert_eq!(
            breaker(&orchestrator, "analytics_ai").last_failure_at,
            Some(T0)
        );

        time.advance(60_001);
        fail_times(&orchestrator, "analytics_ai", 1).await;

        let stats = breaker(&orchestrator, "analytics_ai");
        assert_eq!(stats.state, CircuitState::Open);
        assert_eq!(stats.last_failure_at, Some(T0 + 60_001));
        assert_eq!(module.calls(), 6);
    }

    #[tokio::test]
    async fn test_manual_reset_reopens_traffic() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let module = ScriptedModule::new();
        module.set_failing(true);
        orchestrator
            .register("analytics_ai", module.clone(), &module_config("analytics_ai"))
            .await
            .unwrap();
        fail_times(&orchestrator, "analytics_ai", 5).await;

        orchestrator.registry().reset_breaker("analytics_ai").unwrap();
        module.set_failing(false);

        assert!(orchestrator
            .process("analytics_ai", "retry", Some(context()))
            .await
            .unwrap()
            .success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_module_times_out_and_counts_as_failure() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let module = ScriptedModule::new();
        module.set_delay(Duration::from_secs(5));
        orchestrator
            .register(
                "dialer_ai",
                module.clone(),
                &module_config("dialer_ai").with_response_timeout_ms(100),
            )
            .await
            .unwrap();

        let err = orchestrator
            .process("dialer_ai", "call bob", Some(context()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Registry(RegistryError::Timeout { timeout_ms: 100, .. })
        ));

        let stats = breaker(&orchestrator, "dialer_ai");
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.state, CircuitState::Closed);
    }
}
