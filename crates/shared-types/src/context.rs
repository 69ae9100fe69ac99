//! # Request Context and Response Envelope
//!
//! `ProcessingContext` is constructed per call and describes who is asking
//! and from where. `ModuleResponse` is what every module call returns for
//! expected outcomes, successful or not.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ephemeral per-call context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingContext {
    /// Isolation boundary (organization).
    pub tenant_id: String,
    /// Acting principal (user).
    pub principal_id: String,
    /// Caller session identifier.
    pub session_id: String,
    /// Role of the principal within the tenant.
    pub role: String,
    /// Where the caller currently is, e.g. `/leads/42`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
    /// Entity the caller is looking at, e.g. `lead:42`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_ref: Option<String>,
    /// Free-form metadata supplied by capture layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl ProcessingContext {
    /// Default role assigned when the caller does not supply one.
    pub const DEFAULT_ROLE: &'static str = "user";

    /// Create a context with a fresh session id and the default role.
    pub fn new(tenant_id: impl Into<String>, principal_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            principal_id: principal_id.into(),
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            role: Self::DEFAULT_ROLE.to_string(),
            current_location: None,
            entity_ref: None,
            metadata: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.current_location = Some(location.into());
        self
    }

    pub fn with_entity_ref(mut self, entity_ref: impl Into<String>) -> Self {
        self.entity_ref = Some(entity_ref.into());
        self
    }

    /// Add one metadata entry, creating the map on first use.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    /// Metadata serialized as a JSON string, empty when absent.
    pub fn metadata_json(&self) -> String {
        match &self.metadata {
            Some(map) => serde_json::to_string(map).unwrap_or_default(),
            None => String::new(),
        }
    }
}

/// Result of a module call.
///
/// Expected domain outcomes (permission denied, rate limited, invalid
/// input) are `success: false` values carrying a short user-facing message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_actions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ModuleResponse {
    /// Successful response with payload and confidence score.
    pub fn success(data: Value, confidence: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            confidence: Some(confidence),
            ..Self::default()
        }
    }

    /// Failed response with a short message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        if !suggestions.is_empty() {
            self.suggestions = Some(suggestions);
        }
        self
    }

    pub fn with_next_actions(mut self, next_actions: Vec<String>) -> Self {
        if !next_actions.is_empty() {
            self.next_actions = Some(next_actions);
        }
        self
    }

    /// The error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
