//! The router proper.

use serde::Serialize;
use shared_types::ProcessingContext;
use tracing::debug;

use crate::config::{DelegationRuleConfig, RouterConfig};
use crate::error::RouterError;
use crate::rule::DelegationRule;

/// Where a request was sent and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub target_module: String,
    /// Priority of the matching rule; `None` for the fallback
    pub priority: Option<i32>,
    pub matched_keyword: Option<String>,
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub struct TaskRouter {
    /// Sorted by priority, highest first; ties keep declaration order
    rules: Vec<DelegationRule>,
    fallback_module: Option<String>,
}

impl TaskRouter {
    pub fn new(mut rules: Vec<DelegationRule>) -> Self {
        rules.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Self {
            rules,
            fallback_module: None,
        }
    }

    pub fn from_rule_configs(configs: &[DelegationRuleConfig]) -> Result<Self, RouterError> {
        let rules = configs
            .iter()
            .map(DelegationRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn from_config(config: &RouterConfig) -> Result<Self, RouterError> {
        let router = Self::from_rule_configs(&config.rules)?;
        Ok(match &config.fallback_module {
            Some(fallback) => router.with_fallback(fallback.clone()),
            None => router,
        })
    }

    pub fn with_fallback(mut self, module_id: impl Into<String>) -> Self {
        self.fallback_module = Some(module_id.into());
        self
    }

    pub fn fallback_module(&self) -> Option<&str> {
        self.fallback_module.as_deref()
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[DelegationRule] {
        &self.rules
    }

    /// First matching rule's target, or `NoMatchingRule`.
    pub fn route(
        &self,
        input: &str,
        context: Option<&ProcessingContext>,
    ) -> Result<RouteDecision, RouterError> {
        let input_lower = input.to_lowercase();

        for rule in &self.rules {
            let Some(keyword) = rule.matched_keyword(&input_lower) else {
                continue;
            };
            if !rule.context_matches(context) {
                continue;
            }

            debug!(
                target_module = %rule.target_module(),
                priority = rule.priority(),
                keyword = %keyword,
                "Routed request"
            );
            return Ok(RouteDecision {
                target_module: rule.target_module().to_string(),
                priority: Some(rule.priority()),
                matched_keyword: Some(keyword.to_string()),
                fallback: false,
            });
        }

        Err(RouterError::NoMatchingRule)
    }

    /// Like [`route`](Self::route), but unmatched requests go to the
    /// fallback module when one is configured.
    pub fn route_or_fallback(
        &self,
        input: &str,
        context: Option<&ProcessingContext>,
    ) -> Result<RouteDecision, RouterError> {
        match self.route(input, context) {
            Err(RouterError::NoMatchingRule) => match &self.fallback_module {
                Some(fallback) => {
                    debug!(target_module = %fallback, "No rule matched, using fallback");
                    Ok(RouteDecision {
                        target_module: fallback.clone(),
                        priority: None,
                        matched_keyword: None,
                        fallback: true,
                    })
                }
                None => Err(RouterError::NoMatchingRule),
            },
            other => other,
        }
    }
}
