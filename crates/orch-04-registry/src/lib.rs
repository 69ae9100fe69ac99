//! # ORCH-04: Module Registry
//!
//! Owns every registered capability module together with its status record
//! and circuit breaker; the three are created and removed together.
//!
//! ```text
//! process_request(id, input, ctx)
//!        │
//!        ▼
//!   ┌──────────┐   lookup    ┌──────────────┐  deadline  ┌──────────┐
//!   │ Registry │ ──────────► │CircuitBreaker│ ─────────► │  Module  │
//!   └──────────┘             └──────────────┘            └──────────┘
//!        │  status: response time, error count, state
//!        ▼
//!   heartbeat task (every 30s): concurrent, isolated health checks
//! ```
//!
//! The heartbeat task starts with the first registration and stops when the
//! last module is unregistered or on `shutdown()`.

pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use metrics::{HeartbeatReport, RegistryMetrics};
pub use registry::ModuleRegistry;
