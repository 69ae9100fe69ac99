//! # Orchestrator Runtime
//!
//! Wires the orchestration services together.
//!
//! ```text
//!                 ┌──────────────┐
//!   dispatch ───► │  TaskRouter  │ ── module id ──┐
//!                 └──────────────┘                │
//!   process ─────────────────────────────────────►│
//!                                                 ▼
//!                 ┌──────────────┐   ┌──────────────────────────┐
//!                 │ModuleRegistry│──►│ breaker ─► PipelineModule │
//!                 └──────────────┘   └────────────┬─────────────┘
//!                                                 │ authorize, rate limit,
//!                                                 ▼ sanitize, audit
//!                                        ┌────────────────┐
//!                                        │ SecurityEngine │
//!                                        └────────────────┘
//! ```
//!
//! [`OrchestratorConfig::load`] reads the TOML file named by `ORCH_CONFIG`
//! and applies `ORCH_*` environment overrides.

pub mod config;
pub mod demo;
pub mod error;
pub mod orchestrator;

pub use config::{ConfigError, OrchestratorConfig};
pub use demo::{demo_module_ids, DemoModule};
pub use error::OrchestratorError;
pub use orchestrator::{Dispatch, Orchestrator};
