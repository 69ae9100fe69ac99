//! # ORCH-02: Circuit Breaker
//!
//! One breaker per registered module, isolating a failing module from the
//! rest of the orchestrator.
//!
//! ```text
//!                  success
//!        ┌─────────────────────────────────────┐
//!        ▼                                     │
//!   ┌──────────┐  failures   ┌──────────┐  reset timeout  ┌──────────┐
//!   │  CLOSED  │ ──────────► │   OPEN   │ ──────────────► │HALF-OPEN │
//!   │ (normal) │ ≥ threshold │ (reject) │                 │  (trial) │
//!   └──────────┘             └──────────┘ ◄────────────── └──────────┘
//!                                            failure
//! ```
//!
//! While open, calls are rejected without invoking the operation. A call
//! that exceeds its deadline counts as a failure.

pub mod breaker;
pub mod config;
pub mod error;
pub mod state;

pub use breaker::CircuitBreaker;
pub use config::CircuitBreakerConfig;
pub use error::BreakerError;
pub use state::{CircuitState, CircuitStats};
