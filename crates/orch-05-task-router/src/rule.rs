//! Compiled delegation rules.

use regex::Regex;
use shared_types::ProcessingContext;

use crate::config::DelegationRuleConfig;
use crate::error::RouterError;

/// Immutable once compiled.
#[derive(Debug, Clone)]
pub struct DelegationRule {
    keywords: Vec<String>,
    context_patterns: Vec<Regex>,
    target_module: String,
    priority: i32,
}

impl DelegationRule {
    pub fn compile(config: &DelegationRuleConfig) -> Result<Self, RouterError> {
        let keywords: Vec<String> = config
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .collect();
        if keywords.is_empty() || keywords.iter().any(|k| k.is_empty()) {
            return Err(RouterError::InvalidRule {
                target_module: config.target_module.clone(),
                reason: "keywords must be non-empty".into(),
            });
        }

        let context_patterns = config
            .context_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| RouterError::InvalidPattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            keywords,
            context_patterns,
            target_module: config.target_module.clone(),
            priority: config.priority,
        })
    }

    pub fn target_module(&self) -> &str {
        &self.target_module
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// First keyword found in the already-lowercased input.
    pub fn matched_keyword(&self, input_lower: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| input_lower.contains(k.as_str()))
            .map(String::as_str)
    }

    pub fn context_matches(&self, context: Option<&ProcessingContext>) -> bool {
        if self.context_patterns.is_empty() {
            return true;
        }
        let Some(ctx) = context else {
            return false;
        };

        let metadata = ctx.metadata.as_ref().map(|_| ctx.metadata_json());
        let haystacks = [
            ctx.current_location.as_deref(),
            ctx.entity_ref.as_deref(),
            metadata.as_deref(),
        ];

        self.context_patterns.iter().any(|pattern| {
            haystacks
                .iter()
                .flatten()
                .any(|text| pattern.is_match(text))
        })
    }
}
