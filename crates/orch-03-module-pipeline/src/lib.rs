//! # ORCH-03: Module Execution Pipeline
//!
//! Concrete capability modules implement [`ModuleLogic`] and are wrapped in a
//! [`PipelineModule`], which implements the shared `Module` contract and runs
//! every call through the same steps:
//!
//! | Step | Check | Caller sees on failure |
//! |------|-------|------------------------|
//! | 1 | initialized | `ModuleError::NotInitialized` |
//! | 4 | authorization | `"Insufficient permissions"` |
//! | 5 | rate limit | `"Rate limit exceeded"` |
//! | 6 | input validation + sanitization | `"Invalid input: ..."` |
//! | 8 | module logic | `"Processing failed"` |
//!
//! Steps 2, 3, 7, 9 and 10 record activity, synthesize a default context,
//! audit the interaction, redact the output and score confidence.
//!
//! Errors and panics in module logic never leak detail to the caller; they
//! are audited as `module_processing_error`.

pub mod confidence;
pub mod logic;
pub mod pipeline;

pub use confidence::{ConfidenceStrategy, LengthHeuristic};
pub use logic::{ModuleLogic, ModuleOutput};
pub use pipeline::{PipelineModule, INACTIVITY_LIMIT_MS};
