//! # Driven Ports (Outbound SPI)
//!
//! Hooks the host wires in for critical security events.

use tracing::error;

use crate::domain::audit::AuditEntry;

/// Receives every audit entry with `Critical` severity.
///
/// Called synchronously on the logging path, so implementations should
/// hand off anything slow.
pub trait AlertSink: Send + Sync {
    fn alert(&self, entry: &AuditEntry);
}

/// Default sink: an `error!` line per alert.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAlertSink;

impl AlertSink for LoggingAlertSink {
    fn alert(&self, entry: &AuditEntry) {
        error!(
            audit_id = %entry.id,
            tenant_id = %entry.tenant_id,
            principal_id = %entry.principal_id,
            action = %entry.action,
            resource = %entry.resource,
            "[Security] CRITICAL security event"
        );
    }
}
