//! Configuration for the security engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::policy::RateLimit;
use crate::error::SecurityError;

/// Defaults merged into every policy, plus engine-wide limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Baseline actions granted by a fresh policy
    pub default_allowed_actions: Vec<String>,
    /// Baseline rate limit; also applied to keys without a policy
    pub default_rate_limit: RateLimit,
    /// Fields redacted from object payloads
    pub default_restricted_fields: Vec<String>,
    /// Whether a fresh policy may read other principals' data
    pub default_cross_principal_access: bool,
    /// Maximum audit entries kept in memory
    pub audit_capacity: usize,
    /// Maximum characters of sanitized input
    pub max_input_length: usize,
    /// Replacement for redacted fields
    pub redaction_marker: String,
    /// Source module -> modules it may delegate to
    pub module_communication: HashMap<String, Vec<String>>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut module_communication = HashMap::new();
        module_communication.insert(
            "general_assistant".to_string(),
            strings(&["lead_profile_ai", "dialer_ai", "analytics_ai", "academy_ai"]),
        );
        module_communication.insert(
            "lead_profile_ai".to_string(),
            strings(&["analytics_ai", "dialer_ai"]),
        );
        module_communication.insert(
            "dialer_ai".to_string(),
            strings(&["lead_profile_ai", "analytics_ai"]),
        );
        module_communication.insert("analytics_ai".to_string(), strings(&["lead_profile_ai"]));
        module_communication.insert("academy_ai".to_string(), strings(&["analytics_ai"]));

        Self {
            default_allowed_actions: strings(&["read", "write", "process", "analyze", "route"]),
            default_rate_limit: RateLimit::new(100, 60_000),
            default_restricted_fields: strings(&[
                "ssn",
                "creditCard",
                "salary",
                "bankAccount",
                "password",
                "taxId",
            ]),
            default_cross_principal_access: false,
            audit_capacity: 10_000,
            max_input_length: 10_000,
            redaction_marker: "[REDACTED]".to_string(),
            module_communication,
        }
    }
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), SecurityError> {
        if self.audit_capacity == 0 {
            return Err(SecurityError::InvalidConfig(
                "audit_capacity cannot be 0".into(),
            ));
        }
        if self.max_input_length == 0 {
            return Err(SecurityError::InvalidConfig(
                "max_input_length cannot be 0".into(),
            ));
        }
        self.default_rate_limit
            .validate()
            .map_err(SecurityError::InvalidConfig)
    }
}
