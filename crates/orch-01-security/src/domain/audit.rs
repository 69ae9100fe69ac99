//! Bounded, append-only audit log.
//!
//! Entries are immutable once appended. When the log is full the oldest
//! entry is evicted first.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::Timestamp;
use uuid::Uuid;

/// Severity of an audited decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Immutable record of a security-relevant decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub tenant_id: String,
    pub principal_id: String,
    pub action: String,
    pub resource: String,
    pub success: bool,
    pub severity: AuditSeverity,
    pub metadata: Value,
}

/// An event to be audited; becomes an `AuditEntry` when logged.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub tenant_id: String,
    pub principal_id: String,
    pub action: String,
    pub resource: String,
    pub success: bool,
    pub severity: AuditSeverity,
    pub metadata: Value,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>, severity: AuditSeverity) -> Self {
        Self {
            tenant_id: String::new(),
            principal_id: String::new(),
            action: action.into(),
            resource: String::new(),
            success: true,
            severity,
            metadata: Value::Null,
        }
    }

    pub fn actor(mut self, tenant_id: impl Into<String>, principal_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self.principal_id = principal_id.into();
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn into_entry(self, now: Timestamp) -> AuditEntry {
        let timestamp = i64::try_from(now)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        AuditEntry {
            id: Uuid::new_v4(),
            timestamp,
            tenant_id: self.tenant_id,
            principal_id: self.principal_id,
            action: self.action,
            resource: self.resource,
            success: self.success,
            severity: self.severity,
            metadata: self.metadata,
        }
    }
}

/// FIFO-bounded in-memory log.
#[derive(Debug)]
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl AuditLog {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1_024))),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest when full. Returns evictions.
    pub fn append(&self, entry: AuditEntry) -> usize {
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        let mut evicted = 0;
        while entries.len() > self.capacity {
            entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    /// All entries matching `predicate`, oldest first.
    pub fn filter<F>(&self, predicate: F) -> Vec<AuditEntry>
    where
        F: Fn(&AuditEntry) -> bool,
    {
        self.entries
            .lock()
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    pub fn oldest(&self) -> Option<AuditEntry> {
        self.entries.lock().front().cloned()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
