//! Inter-module delegation allow-list.

use std::collections::{HashMap, HashSet};

/// Source module -> set of modules it may hand work to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunicationMatrix {
    allowed: HashMap<String, HashSet<String>>,
}

impl CommunicationMatrix {
    pub fn from_config(config: &HashMap<String, Vec<String>>) -> Self {
        let allowed = config
            .iter()
            .map(|(source, targets)| (source.clone(), targets.iter().cloned().collect()))
            .collect();
        Self { allowed }
    }

    /// Unknown sources may not talk to anyone.
    pub fn is_allowed(&self, source: &str, target: &str) -> bool {
        self.allowed
            .get(source)
            .is_some_and(|targets| targets.contains(target))
    }

    pub fn targets_of(&self, source: &str) -> Vec<String> {
        let mut targets: Vec<_> = self
            .allowed
            .get(source)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default();
        targets.sort();
        targets
    }
}
