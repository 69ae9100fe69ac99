//! Security policies and access decisions.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

/// Fixed-window request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed per window
    pub requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RateLimit {
    pub fn new(requests: u32, window_ms: u64) -> Self {
        Self {
            requests,
            window_ms,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.requests == 0 {
            return Err("rate limit requests cannot be 0".into());
        }
        if self.window_ms == 0 {
            return Err("rate limit window_ms cannot be 0".into());
        }
        Ok(())
    }
}

/// What a principal may see of other principals' data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAccessRules {
    pub can_access_other_principal_data: bool,
    pub restricted_fields: HashSet<String>,
}

/// Policy for one `(tenant, principal)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub allowed_actions: HashSet<String>,
    pub rate_limit: RateLimit,
    pub data_access_rules: DataAccessRules,
}

impl SecurityPolicy {
    /// Baseline policy built from engine defaults.
    pub fn from_defaults(config: &SecurityConfig) -> Self {
        Self {
            allowed_actions: config.default_allowed_actions.iter().cloned().collect(),
            rate_limit: config.default_rate_limit,
            data_access_rules: DataAccessRules {
                can_access_other_principal_data: config.default_cross_principal_access,
                restricted_fields: config.default_restricted_fields.iter().cloned().collect(),
            },
        }
    }

    /// Defaults with every supplied override replacing its field.
    pub fn merged(config: &SecurityConfig, overrides: PolicyOverrides) -> Self {
        let mut policy = Self::from_defaults(config);
        if let Some(actions) = overrides.allowed_actions {
            policy.allowed_actions = actions;
        }
        if let Some(rate_limit) = overrides.rate_limit {
            policy.rate_limit = rate_limit;
        }
        if let Some(cross) = overrides.can_access_other_principal_data {
            policy.data_access_rules.can_access_other_principal_data = cross;
        }
        if let Some(fields) = overrides.restricted_fields {
            policy.data_access_rules.restricted_fields = fields;
        }
        policy
    }

    pub fn allows(&self, action: &str) -> bool {
        self.allowed_actions.contains(action)
    }

    pub fn is_restricted(&self, field: &str) -> bool {
        self.data_access_rules.restricted_fields.contains(field)
    }
}

/// Partial policy supplied at initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub allowed_actions: Option<HashSet<String>>,
    pub rate_limit: Option<RateLimit>,
    pub can_access_other_principal_data: Option<bool>,
    pub restricted_fields: Option<HashSet<String>>,
}

impl PolicyOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowed_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    pub fn rate_limit(mut self, requests: u32, window_ms: u64) -> Self {
        self.rate_limit = Some(RateLimit::new(requests, window_ms));
        self
    }

    pub fn cross_principal_access(mut self, allowed: bool) -> Self {
        self.can_access_other_principal_data = Some(allowed);
        self
    }

    pub fn restricted_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restricted_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Policy map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyKey {
    pub tenant_id: String,
    pub principal_id: String,
}

impl PolicyKey {
    pub fn new(tenant_id: impl Into<String>, principal_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            principal_id: principal_id.into(),
        }
    }
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tenant_id, self.principal_id)
    }
}

/// Why an access check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    NoPolicy,
    ActionNotAllowed { action: String },
    CrossPrincipalAccess { target_principal: String },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPolicy => write!(f, "no_policy"),
            Self::ActionNotAllowed { action } => write!(f, "action_not_allowed:{}", action),
            Self::CrossPrincipalAccess { target_principal } => {
                write!(f, "cross_principal_access:{}", target_principal)
            }
        }
    }
}

/// Outcome of `validate_access`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}
