//! Aggregate views over the registry.

use std::collections::BTreeMap;

use serde::Serialize;

/// Counters across every registered module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryMetrics {
    pub registered: usize,
    pub active: usize,
    pub error: usize,
    pub total_requests: u64,
    pub total_failures: u64,
    pub open_circuits: usize,
}

/// Outcome of one heartbeat tick, keyed by module id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeartbeatReport {
    pub results: BTreeMap<String, bool>,
}

impl HeartbeatReport {
    pub fn is_healthy(&self, module_id: &str) -> Option<bool> {
        self.results.get(module_id).copied()
    }

    pub fn unhealthy(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, healthy)| !**healthy)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
