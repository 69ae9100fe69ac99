//! # Security Flows
//!
//! Every call through the orchestrator passes the security engine before
//! module logic runs:
//!
//! 1. **Authorization**: a principal without the module's action is turned
//!    away with one audit entry and the logic untouched.
//! 2. **Rate limiting**: the fixed window admits exactly its budget.
//! 3. **Sanitization**: markup never reaches module logic; restricted
//!    fields never reach the caller.
//! 4. **Audit**: the log is bounded and critical entries raise alerts.
//! 5. **Delegation**: modules only hand work to allow-listed peers.

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use async_trait::async_trait;
    use orch_01_security::{AuditEvent, AuditSeverity, SecurityApi, SecurityConfig, SecurityEngine};
    use orch_03_module_pipeline::{ModuleLogic, ModuleOutput, PipelineModule};
    use orch_runtime::{DemoModule, OrchestratorConfig};
    use serde_json::json;
    use shared_types::{Module, ModuleConfig, ModuleError, ProcessingContext};

    use crate::integration::fixtures::{
        context, manual_orchestrator, CountingLogic, PRINCIPAL, TENANT,
    };

    struct PanickingLogic;

    #[async_trait]
    impl ModuleLogic for PanickingLogic {
        async fn initialize_module(&self) -> Result<(), ModuleError> {
            Ok(())
        }

        async fn process_request(
            &self,
            _sanitized_input: &str,
            _context: &ProcessingContext,
        ) -> Result<ModuleOutput, ModuleError> {
            panic!("index out of range in scoring table");
        }

        async fn perform_health_check(&self) -> bool {
            true
        }

        async fn cleanup_module(&self) -> Result<(), ModuleError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_permission_denial_audits_once_and_skips_logic() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let (logic, calls) = CountingLogic::new(json!({ "ok": true }));
        orchestrator
            .register_module(
                ModuleConfig::new("analytics_ai", TENANT, PRINCIPAL)
                    .with_permissions(vec!["read".to_string()]),
                logic,
            )
            .await
            .unwrap();
        let audited_before = orchestrator.security().audit_len();

        let response = orchestrator
            .process("analytics_ai", "weekly report", Some(context()))
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(response.error_message(), Some("Insufficient permissions"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let security = orchestrator.security();
        assert_eq!(security.audit_len(), audited_before + 1);
        let entry = &security.recent_audit(1)[0];
        assert_eq!(entry.action, "access_denied");
        assert_eq!(entry.severity, AuditSeverity::Medium);
        assert!(!entry.success);
        assert_eq!(entry.principal_id, PRINCIPAL);
    }

    #[tokio::test]
    async fn test_cross_principal_request_denied() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let (logic, calls) = CountingLogic::new(json!({ "ok": true }));
        orchestrator
            .register_module(ModuleConfig::new("lead_profile_ai", TENANT, PRINCIPAL), logic)
            .await
            .unwrap();

        let ctx = context().with_metadata("target_principal", json!("bob"));
        let response = orchestrator
            .process("lead_profile_ai", "open lead 42", Some(ctx))
            .await
            .unwrap();

        assert_eq!(response.error_message(), Some("Insufficient permissions"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_window_admits_exactly_budget() {
        let (orchestrator, time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let (logic, calls) = CountingLogic::new(json!({ "ok": true }));
        orchestrator
            .register_module(ModuleConfig::new("analytics_ai", TENANT, PRINCIPAL), logic)
            .await
            .unwrap();

        for i in 1..=100 {
            let response = orchestrator
                .process("analytics_ai", "conversion stats", Some(context()))
                .await
                .unwrap();
            assert!(response.success, "call {i} should pass");
        }

        let response = orchestrator
            .process("analytics_ai", "conversion stats", Some(context()))
            .await
            .unwrap();
        assert_eq!(response.error_message(), Some("Rate limit exceeded"));
        assert_eq!(calls.load(Ordering::SeqCst), 100);

        let limited = orchestrator
            .security()
            .audit_for_tenant(TENANT)
            .into_iter()
            .filter(|e| e.action == "rate_limit_exceeded")
            .count();
        assert_eq!(limited, 1);

        // A denied response is not a module failure
        let status = orchestrator.status("analytics_ai").unwrap();
        assert_eq!(status.error_count, 0);

        time.advance(60_001);
        let response = orchestrator
            .process("analytics_ai", "conversion stats", Some(context()))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(calls.load(Ordering::SeqCst), 101);
    }

    #[tokio::test]
    async fn test_rate_limits_are_per_principal() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        orchestrator
            .security()
            .initialize_policy(TENANT, "bob", None)
            .unwrap();
        let (logic, _calls) = CountingLogic::new(json!({ "ok": true }));
        let config = ModuleConfig::new("analytics_ai", TENANT, PRINCIPAL);
        orchestrator.register_module(config, logic).await.unwrap();
        orchestrator
            .security()
            .initialize_policy(
                TENANT,
                PRINCIPAL,
                Some(orch_01_security::PolicyOverrides::new().rate_limit(1, 60_000)),
            )
            .unwrap();

        assert!(orchestrator
            .process("analytics_ai", "stats", Some(context()))
            .await
            .unwrap()
            .success);
        assert!(!orchestrator
            .process("analytics_ai", "stats", Some(context()))
            .await
            .unwrap()
            .success);

        let bob = ProcessingContext::new(TENANT, "bob");
        assert!(orchestrator
            .process("analytics_ai", "stats", Some(bob))
            .await
            .unwrap()
            .success);
    }

    #[tokio::test]
    async fn test_script_is_stripped_before_logic_sees_input() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        orchestrator
            .register_module(
                ModuleConfig::new("general_assistant", TENANT, PRINCIPAL),
                DemoModule::for_id("general_assistant").unwrap(),
            )
            .await
            .unwrap();

        let response = orchestrator
            .process(
                "general_assistant",
                "<script>alert(1)</script>Hello",
                Some(context()),
            )
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.data.unwrap()["request"], "Hello");

        let response = orchestrator
            .process("general_assistant", "<script>alert(1)</script>", Some(context()))
            .await
            .unwrap();
        assert_eq!(
            response.error_message(),
            Some("Invalid input: input contains no usable content")
        );
    }

    #[tokio::test]
    async fn test_restricted_fields_redacted_in_response() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let (logic, _calls) = CountingLogic::new(json!({
            "name": "Jane Doe",
            "ssn": "123-45-6789",
            "salary": 90_000,
        }));
        orchestrator
            .register_module(ModuleConfig::new("lead_profile_ai", TENANT, PRINCIPAL), logic)
            .await
            .unwrap();

        let response = orchestrator
            .process("lead_profile_ai", "open lead 42", Some(context()))
            .await
            .unwrap();

        let data = response.data.unwrap();
        assert_eq!(data["name"], "Jane Doe");
        assert_eq!(data["ssn"], "[REDACTED]");
        assert_eq!(data["salary"], "[REDACTED]");
    }

    #[tokio::test]
    async fn test_logic_panic_becomes_processing_failed() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        orchestrator
            .register_module(
                ModuleConfig::new("analytics_ai", TENANT, PRINCIPAL),
                PanickingLogic,
            )
            .await
            .unwrap();

        let response = orchestrator
            .process("analytics_ai", "score the pipeline", Some(context()))
            .await
            .unwrap();
        assert_eq!(response.error_message(), Some("Processing failed"));

        let entry = &orchestrator.security().recent_audit(1)[0];
        assert_eq!(entry.action, "module_processing_error");
        assert_eq!(entry.severity, AuditSeverity::High);
        assert_eq!(entry.metadata["kind"], "panic");

        // Contained by the pipeline, so the breaker never sees it
        assert_eq!(orchestrator.registry().breaker_stats()[0].failure_count, 0);
    }

    #[test]
    fn test_audit_log_keeps_newest_ten_thousand() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let security = orchestrator.security();

        for seq in 0..10_050 {
            security.log_event(
                AuditEvent::new("module_interaction", AuditSeverity::Low)
                    .actor(TENANT, PRINCIPAL)
                    .metadata(json!({ "seq": seq })),
            );
        }

        assert_eq!(security.audit_len(), 10_000);
        let entries = security.recent_audit(10_000);
        assert_eq!(entries[0].metadata["seq"], 50);
        assert_eq!(entries[9_999].metadata["seq"], 10_049);
    }

    #[test]
    fn test_critical_events_reach_alert_sink() {
        let (orchestrator, _time, alerts) = manual_orchestrator(OrchestratorConfig::default());
        let security = orchestrator.security();

        security.log_event(AuditEvent::new("policy_tampering", AuditSeverity::Critical));
        security.log_event(AuditEvent::new("access_denied", AuditSeverity::Medium));

        let alerted = alerts.alerts();
        assert_eq!(alerted.len(), 1);
        assert_eq!(alerted[0].action, "policy_tampering");
    }

    #[tokio::test]
    async fn test_delegation_follows_allow_list() {
        let security = Arc::new(SecurityEngine::new(SecurityConfig::default()).unwrap());
        security.initialize_policy(TENANT, PRINCIPAL, None).unwrap();
        let api: Arc<dyn SecurityApi> = security.clone();

        let module = |id: &str| {
            PipelineModule::new(
                ModuleConfig::new(id, TENANT, PRINCIPAL),
                DemoModule::for_id(id).unwrap(),
                Arc::clone(&api),
            )
        };
        let dialer = module("dialer_ai");
        let lead_profile = module("lead_profile_ai");
        let academy = module("academy_ai");
        for m in [&dialer, &lead_profile, &academy] {
            m.initialize().await.unwrap();
        }

        let allowed = dialer
            .delegate("lead_profile_ai", &lead_profile, "open lead 42", context())
            .await
            .unwrap();
        assert!(allowed.success);
        assert_eq!(allowed.data.unwrap()["module"], "lead_profile_ai");

        let denied = academy
            .delegate("dialer_ai", &dialer, "call everyone", context())
            .await
            .unwrap();
        assert_eq!(denied.error_message(), Some("Module communication not allowed"));
        assert_eq!(dialer.logic().handled(), 0);

        let entry = &security.recent_audit(1)[0];
        assert_eq!(entry.action, "module_communication_denied");
        assert_eq!(entry.severity, AuditSeverity::High);
        assert_eq!(entry.resource, "dialer_ai");
    }
}
