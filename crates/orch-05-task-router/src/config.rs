//! Serde form of the rule table.

use serde::{Deserialize, Serialize};

/// One delegation rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRuleConfig {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub context_patterns: Vec<String>,
    pub target_module: String,
    #[serde(default)]
    pub priority: i32,
}

impl DelegationRuleConfig {
    pub fn new<I, S>(keywords: I, target_module: impl Into<String>, priority: i32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            context_patterns: Vec::new(),
            target_module: target_module.into(),
            priority,
        }
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub rules: Vec<DelegationRuleConfig>,
    /// General-purpose module used when nothing matches
    pub fallback_module: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            fallback_module: Some("general_assistant".to_string()),
        }
    }
}

/// Built-in rule table for the standard capability modules.
pub fn default_rules() -> Vec<DelegationRuleConfig> {
    vec![
        DelegationRuleConfig::new(["lead", "profile", "contact"], "lead_profile_ai", 10)
            .with_patterns([r"/leads/\d+", r"^lead:"]),
        DelegationRuleConfig::new(["call", "dial", "phone", "voicemail"], "dialer_ai", 9),
        DelegationRuleConfig::new(
            ["report", "analytics", "metrics", "conversion", "stats"],
            "analytics_ai",
            8,
        ),
        DelegationRuleConfig::new(["learn", "training", "course", "lesson"], "academy_ai", 7),
    ]
}
