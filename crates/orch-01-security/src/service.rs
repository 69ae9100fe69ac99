//! # Security Engine
//!
//! Implements `SecurityApi` over in-memory state:
//!
//! - policies: `RwLock<HashMap<PolicyKey, SecurityPolicy>>`
//! - rate limits: sharded `FixedWindowLimiter`
//! - audit: bounded `AuditLog`
//!
//! No method holds a lock while calling out to the alert sink.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::{json, Value};
use shared_types::{SystemTimeSource, TimeSource};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SecurityConfig;
use crate::domain::audit::{AuditEntry, AuditEvent, AuditLog, AuditSeverity};
use crate::domain::communication::CommunicationMatrix;
use crate::domain::policy::{
    AccessDecision, DenialReason, PolicyKey, PolicyOverrides, RateLimit, SecurityPolicy,
};
use crate::domain::rate_limit::{FixedWindowLimiter, RateLimitDecision};
use crate::domain::sanitize::InputSanitizer;
use crate::error::SecurityError;
use crate::ports::inbound::SecurityApi;
use crate::ports::outbound::{AlertSink, LoggingAlertSink};

pub struct SecurityEngine {
    config: SecurityConfig,
    policies: RwLock<HashMap<PolicyKey, SecurityPolicy>>,
    limiter: FixedWindowLimiter,
    audit: AuditLog,
    sanitizer: InputSanitizer,
    communication: CommunicationMatrix,
    alert_sink: Arc<dyn AlertSink>,
    time: Arc<dyn TimeSource>,
}

impl SecurityEngine {
    /// Engine with the system clock and a logging alert sink.
    pub fn new(config: SecurityConfig) -> Result<Self, SecurityError> {
        Self::with_collaborators(
            config,
            Arc::new(LoggingAlertSink),
            Arc::new(SystemTimeSource),
        )
    }

    pub fn with_collaborators(
        config: SecurityConfig,
        alert_sink: Arc<dyn AlertSink>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, SecurityError> {
        config.validate()?;

        Ok(Self {
            policies: RwLock::new(HashMap::new()),
            limiter: FixedWindowLimiter::new(),
            audit: AuditLog::new(config.audit_capacity),
            sanitizer: InputSanitizer::new(config.max_input_length),
            communication: CommunicationMatrix::from_config(&config.module_communication),
            alert_sink,
            time,
            config,
        })
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Current policy for the key, if any.
    pub fn policy(&self, tenant_id: &str, principal_id: &str) -> Option<SecurityPolicy> {
        self.policies
            .read()
            .get(&PolicyKey::new(tenant_id, principal_id))
            .cloned()
    }

    /// Remove a policy; subsequent access checks for the key are denied.
    pub fn remove_policy(&self, tenant_id: &str, principal_id: &str) -> Option<SecurityPolicy> {
        let removed = self
            .policies
            .write()
            .remove(&PolicyKey::new(tenant_id, principal_id));
        if removed.is_some() {
            info!(
                tenant_id = %tenant_id,
                principal_id = %principal_id,
                "[Security] Policy removed"
            );
        }
        removed
    }

    /// Put back a policy previously read with [`SecurityEngine::policy`].
    pub fn restore_policy(&self, tenant_id: &str, principal_id: &str, policy: SecurityPolicy) {
        debug!(
            tenant_id = %tenant_id,
            principal_id = %principal_id,
            "[Security] Policy restored"
        );
        self.policies
            .write()
            .insert(PolicyKey::new(tenant_id, principal_id), policy);
    }

    pub fn recent_audit(&self, n: usize) -> Vec<AuditEntry> {
        self.audit.recent(n)
    }

    pub fn audit_for_tenant(&self, tenant_id: &str) -> Vec<AuditEntry> {
        self.audit.filter(|e| e.tenant_id == tenant_id)
    }

    pub fn audit_len(&self) -> usize {
        self.audit.len()
    }

    /// Drop rate-limit windows idle for longer than `max_idle`.
    pub fn cleanup_rate_limits(&self, max_idle: Duration) -> usize {
        let removed = self
            .limiter
            .cleanup(max_idle.as_millis() as u64, self.time.now());
        if removed > 0 {
            debug!(removed, "[Security] Cleaned up idle rate limit entries");
        }
        removed
    }

    /// Periodically run `cleanup_rate_limits` on the current runtime.
    pub fn spawn_rate_limit_cleanup(
        self: Arc<Self>,
        interval: Duration,
        max_idle: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                self.cleanup_rate_limits(max_idle);
            }
        })
    }

    fn effective_rate_limit(&self, key: &PolicyKey) -> RateLimit {
        self.policies
            .read()
            .get(key)
            .map(|p| p.rate_limit)
            .unwrap_or(self.config.default_rate_limit)
    }

    fn effective_restricted_fields(&self, key: &PolicyKey) -> HashSet<String> {
        match self.policies.read().get(key) {
            Some(policy) => policy.data_access_rules.restricted_fields.clone(),
            None => self
                .config
                .default_restricted_fields
                .iter()
                .cloned()
                .collect(),
        }
    }

    fn deny(&self, tenant_id: &str, principal_id: &str, action: &str, reason: DenialReason) {
        warn!(
            tenant_id = %tenant_id,
            principal_id = %principal_id,
            action = %action,
            reason = %reason,
            "[Security] Access denied"
        );
        self.log_event(
            AuditEvent::new("access_denied", AuditSeverity::Medium)
                .actor(tenant_id, principal_id)
                .resource(action)
                .failed()
                .metadata(json!({ "reason": reason.to_string() })),
        );
    }
}

impl SecurityApi for SecurityEngine {
    fn initialize_policy(
        &self,
        tenant_id: &str,
        principal_id: &str,
        overrides: Option<PolicyOverrides>,
    ) -> Result<SecurityPolicy, SecurityError> {
        let overrides = overrides.unwrap_or_default();
        if let Some(rate_limit) = overrides.rate_limit {
            rate_limit.validate().map_err(SecurityError::InvalidOverride)?;
        }

        let policy = SecurityPolicy::merged(&self.config, overrides);
        let key = PolicyKey::new(tenant_id, principal_id);

        info!(
            policy_key = %key,
            actions = policy.allowed_actions.len(),
            requests = policy.rate_limit.requests,
            window_ms = policy.rate_limit.window_ms,
            "[Security] Policy initialized"
        );
        self.policies.write().insert(key, policy.clone());

        Ok(policy)
    }

    fn validate_access(
        &self,
        requesting_principal: &str,
        target_principal: &str,
        tenant_id: &str,
        action: &str,
    ) -> AccessDecision {
        let key = PolicyKey::new(tenant_id, requesting_principal);

        let reason = {
            let policies = self.policies.read();
            match policies.get(&key) {
                None => Some(DenialReason::NoPolicy),
                Some(policy) if !policy.allows(action) => Some(DenialReason::ActionNotAllowed {
                    action: action.to_string(),
                }),
                Some(policy)
                    if requesting_principal != target_principal
                        && !policy.data_access_rules.can_access_other_principal_data =>
                {
                    Some(DenialReason::CrossPrincipalAccess {
                        target_principal: target_principal.to_string(),
                    })
                }
                Some(_) => None,
            }
        };

        match reason {
            None => AccessDecision::Granted,
            Some(reason) => {
                self.deny(tenant_id, requesting_principal, action, reason.clone());
                AccessDecision::Denied(reason)
            }
        }
    }

    fn check_rate_limit(&self, tenant_id: &str, principal_id: &str) -> RateLimitDecision {
        let key = PolicyKey::new(tenant_id, principal_id);
        let limit = self.effective_rate_limit(&key);
        let decision = self.limiter.check(&key, limit, self.time.now());

        if let RateLimitDecision::Limited { retry_after_ms } = decision {
            warn!(
                tenant_id = %tenant_id,
                principal_id = %principal_id,
                retry_after_ms,
                "[Security] Rate limit exceeded"
            );
            self.log_event(
                AuditEvent::new("rate_limit_exceeded", AuditSeverity::Medium)
                    .actor(tenant_id, principal_id)
                    .resource("rate_limit")
                    .failed()
                    .metadata(json!({
                        "limit": limit.requests,
                        "window_ms": limit.window_ms,
                        "retry_after_ms": retry_after_ms,
                    })),
            );
        }

        decision
    }

    fn sanitize_input(&self, input: &str) -> String {
        self.sanitizer.sanitize(input)
    }

    fn sanitize_output(&self, data: Value, tenant_id: &str, principal_id: &str) -> Value {
        let mut map = match data {
            Value::Object(map) => map,
            other => return other,
        };

        let restricted = self.effective_restricted_fields(&PolicyKey::new(tenant_id, principal_id));
        for (field, value) in map.iter_mut() {
            if restricted.contains(field) {
                *value = Value::String(self.config.redaction_marker.clone());
            }
        }

        Value::Object(map)
    }

    fn log_event(&self, event: AuditEvent) -> AuditEntry {
        let entry = event.into_entry(self.time.now());
        let evicted = self.audit.append(entry.clone());
        if evicted > 0 {
            debug!(evicted, "[Security] Audit log at capacity, evicted oldest");
        }

        if entry.severity == AuditSeverity::Critical {
            self.alert_sink.alert(&entry);
        }

        entry
    }

    fn validate_module_communication(&self, source_module: &str, target_module: &str) -> bool {
        if self.communication.is_allowed(source_module, target_module) {
            return true;
        }

        warn!(
            source_module = %source_module,
            target_module = %target_module,
            "[Security] Module communication denied"
        );
        self.log_event(
            AuditEvent::new("module_communication_denied", AuditSeverity::High)
                .actor("system", source_module)
                .resource(target_module)
                .failed()
                .metadata(json!({ "source": source_module, "target": target_module })),
        );
        false
    }
}
