//! # Shared Types Crate
//!
//! Types that cross crate boundaries in the orchestration core.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the `Module` contract, `ProcessingContext`,
//!   `ModuleResponse` and `ModuleStatus` are defined here and nowhere else.
//! - **Values, not exceptions, for domain outcomes**: a denied or rate-limited
//!   request is a `ModuleResponse { success: false, .. }`. Only infrastructure
//!   failures travel as `ModuleError`.
//! - **Injected time**: everything that reads a clock goes through
//!   `TimeSource` so tests can drive it deterministically.

pub mod context;
pub mod errors;
pub mod module;
pub mod time;

pub use context::{ModuleResponse, ProcessingContext};
pub use errors::ModuleError;
pub use module::{Module, ModuleConfig, ModuleState, ModuleStatus};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource, Timestamp};
