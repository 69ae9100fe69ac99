//! # ORCH-01: Security & Policy Engine
//!
//! Guards every call into a capability module.
//!
//! ## Responsibilities
//!
//! - **Policies**: one `SecurityPolicy` per `(tenant, principal)`; a missing
//!   policy means deny.
//! - **Rate limiting**: fixed-window counters keyed `tenant:principal`.
//! - **Sanitization**: markup/script stripping on input, field redaction on
//!   output.
//! - **Audit**: bounded append-only log; critical events fire an alert hook.
//! - **Inter-module communication**: static allow-list by source module.
//!
//! ## Architecture
//!
//! - **Domain**: policy, rate limit, sanitize, audit, communication
//! - **Ports**: Inbound (`SecurityApi`) and Outbound (`AlertSink`)
//! - **Service**: `SecurityEngine` wiring the domain pieces together

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::SecurityConfig;
pub use domain::audit::{AuditEntry, AuditEvent, AuditLog, AuditSeverity};
pub use domain::communication::CommunicationMatrix;
pub use domain::policy::{
    AccessDecision, DataAccessRules, DenialReason, PolicyKey, PolicyOverrides, RateLimit,
    SecurityPolicy,
};
pub use domain::rate_limit::{FixedWindowLimiter, RateLimitDecision, RateLimitEntry};
pub use domain::sanitize::InputSanitizer;
pub use error::SecurityError;
pub use ports::inbound::SecurityApi;
pub use ports::outbound::{AlertSink, LoggingAlertSink};
pub use service::SecurityEngine;
