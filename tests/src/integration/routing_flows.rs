//! # Routing and Monitoring Flows
//!
//! Requests enter through the router, land in the registry and come back
//! as responses; the heartbeat keeps module state honest in between.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use orch_runtime::{demo_module_ids, DemoModule, Orchestrator, OrchestratorConfig};
    use shared_types::{ModuleConfig, ModuleState, ProcessingContext};

    use crate::integration::fixtures::{
        context, manual_orchestrator, ScriptedModule, PRINCIPAL, TENANT,
    };

    const TWO_RULES: &str = r#"
        [router]

        [[router.rules]]
        keywords = ["lead", "profile"]
        context_patterns = ['/leads/\d+']
        target_module = "lead_profile_ai"
        priority = 10

        [[router.rules]]
        keywords = ["call"]
        target_module = "dialer_ai"
        priority = 9
    "#;

    fn two_rule_config() -> OrchestratorConfig {
        let mut config = OrchestratorConfig::from_toml_str(TWO_RULES).unwrap();
        config.router.fallback_module = None;
        config
    }

    async fn register_demos(orchestrator: &Orchestrator) {
        for id in demo_module_ids() {
            orchestrator
                .register_module(
                    ModuleConfig::new(id, TENANT, PRINCIPAL),
                    DemoModule::for_id(id).unwrap(),
                )
                .await
                .unwrap();
        }
    }

    #[test]
    fn test_routing_precedence() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(two_rule_config());
        let at_lead = context().with_location("/leads/42");

        assert_eq!(
            orchestrator
                .route("update lead profile", Some(&at_lead))
                .unwrap(),
            "lead_profile_ai"
        );
        assert_eq!(
            orchestrator.route("call now", Some(&at_lead)).unwrap(),
            "dialer_ai"
        );
        assert!(orchestrator
            .route("unrelated", Some(&at_lead))
            .unwrap_err()
            .is_unroutable());
    }

    #[tokio::test]
    async fn test_dispatch_without_fallback_reports_unroutable() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(two_rule_config());
        register_demos(&orchestrator).await;

        let err = orchestrator
            .dispatch("unrelated", Some(context()))
            .await
            .unwrap_err();
        assert!(err.is_unroutable());
    }

    #[tokio::test]
    async fn test_dispatch_end_to_end() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        register_demos(&orchestrator).await;

        let cases = [
            ("pull the conversion report", None, "analytics_ai"),
            ("dial the next lead", None, "dialer_ai"),
            ("start the onboarding course", None, "academy_ai"),
            ("edit this profile", Some("lead:42"), "lead_profile_ai"),
            ("what's the weather", None, "general_assistant"),
        ];

        for (input, entity, expected) in cases {
            let mut ctx = context();
            if let Some(entity) = entity {
                ctx = ctx.with_entity_ref(entity);
            }
            let dispatch = orchestrator.dispatch(input, Some(ctx)).await.unwrap();
            assert_eq!(dispatch.route.target_module, expected, "input: {input}");
            assert!(dispatch.response.success, "input: {input}");
            assert_eq!(
                dispatch.response.data.as_ref().unwrap()["module"],
                expected
            );
        }

        assert_eq!(orchestrator.metrics().total_requests, 5);
    }

    #[tokio::test]
    async fn test_dispatch_outcome_serializes() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        register_demos(&orchestrator).await;

        let dispatch = orchestrator
            .dispatch("call the customer back", Some(context()))
            .await
            .unwrap();
        let json = serde_json::to_value(&dispatch).unwrap();

        assert_eq!(json["route"]["target_module"], "dialer_ai");
        assert_eq!(json["route"]["matched_keyword"], "call");
        assert_eq!(json["response"]["success"], true);
        assert!(json["response"].get("error").is_none());
    }

    #[tokio::test]
    async fn test_heartbeat_isolates_bad_health_checks() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        let fine = ScriptedModule::new();
        let unhealthy = ScriptedModule::new();
        unhealthy.set_unhealthy(true);
        let crashing = ScriptedModule::new();
        crashing.set_panic_on_health(true);

        for (id, module) in [
            ("analytics_ai", fine),
            ("dialer_ai", unhealthy),
            ("academy_ai", crashing),
        ] {
            orchestrator
                .register(id, module, &ModuleConfig::new(id, TENANT, PRINCIPAL))
                .await
                .unwrap();
        }

        let report = orchestrator.run_heartbeat().await;
        assert_eq!(report.is_healthy("analytics_ai"), Some(true));
        assert_eq!(report.is_healthy("dialer_ai"), Some(false));
        assert_eq!(report.is_healthy("academy_ai"), Some(false));

        let state = |id: &str| orchestrator.status(id).unwrap().state;
        assert_eq!(state("analytics_ai"), ModuleState::Active);
        assert_eq!(state("dialer_ai"), ModuleState::Error);
        assert_eq!(state("academy_ai"), ModuleState::Error);

        // Unhealthy modules still take requests; the breaker decides that
        let response = orchestrator
            .process("dialer_ai", "call bob", Some(context()))
            .await
            .unwrap();
        assert!(response.success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_heartbeat_marks_unhealthy_module() {
        let orchestrator = Orchestrator::new(OrchestratorConfig::default()).unwrap();
        let module = ScriptedModule::new();
        orchestrator
            .register(
                "dialer_ai",
                module.clone(),
                &ModuleConfig::new("dialer_ai", TENANT, PRINCIPAL),
            )
            .await
            .unwrap();
        assert!(orchestrator.registry().is_heartbeat_running());

        module.set_unhealthy(true);
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(
            orchestrator.status("dialer_ai").unwrap().state,
            ModuleState::Error
        );

        orchestrator.shutdown().await;
        assert!(!orchestrator.registry().is_heartbeat_running());
    }

    #[tokio::test]
    async fn test_requests_for_unknown_principal_are_denied() {
        let (orchestrator, _time, _alerts) = manual_orchestrator(OrchestratorConfig::default());
        register_demos(&orchestrator).await;

        let stranger = ProcessingContext::new("globex", "mallory");
        let dispatch = orchestrator
            .dispatch("weekly analytics", Some(stranger))
            .await
            .unwrap();
        assert_eq!(dispatch.route.target_module, "analytics_ai");
        assert_eq!(
            dispatch.response.error_message(),
            Some("Insufficient permissions")
        );
    }
}
