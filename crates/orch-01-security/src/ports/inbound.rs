//! # Driving Ports (Inbound API)
//!
//! What the module pipeline and the registry call into.

use serde_json::Value;

use crate::domain::audit::{AuditEntry, AuditEvent};
use crate::domain::policy::{AccessDecision, PolicyOverrides, SecurityPolicy};
use crate::domain::rate_limit::RateLimitDecision;
use crate::error::SecurityError;

/// Security checks wrapped around every module call.
///
/// Every method is synchronous and lock-bounded; none of them await.
pub trait SecurityApi: Send + Sync {
    /// Create or replace the policy for `(tenant_id, principal_id)`.
    ///
    /// Overrides replace the corresponding default. Last write wins.
    fn initialize_policy(
        &self,
        tenant_id: &str,
        principal_id: &str,
        overrides: Option<PolicyOverrides>,
    ) -> Result<SecurityPolicy, SecurityError>;

    /// Decide whether `requesting_principal` may perform `action` on data
    /// owned by `target_principal`. Denials are audited.
    fn validate_access(
        &self,
        requesting_principal: &str,
        target_principal: &str,
        tenant_id: &str,
        action: &str,
    ) -> AccessDecision;

    /// Count one request against the `tenant:principal` window.
    fn check_rate_limit(&self, tenant_id: &str, principal_id: &str) -> RateLimitDecision;

    /// Strip markup and scripts, trim, cap and entity-encode.
    fn sanitize_input(&self, input: &str) -> String;

    /// Redact restricted top-level fields of object payloads.
    fn sanitize_output(&self, data: Value, tenant_id: &str, principal_id: &str) -> Value;

    /// Append an audit entry; critical entries also raise an alert.
    fn log_event(&self, event: AuditEvent) -> AuditEntry;

    /// Whether `source_module` may delegate to `target_module`.
    fn validate_module_communication(&self, source_module: &str, target_module: &str) -> bool;
}
