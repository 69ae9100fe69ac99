//! # Orchestrator Telemetry
//!
//! Logging setup shared by the orchestrator binary and its tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use orch_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_logging(&config)?;
//!     // Structured logs are now emitted through `tracing`.
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ORCH_SERVICE_NAME` | `module-orchestrator` | Service name on every log line |
//! | `ORCH_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `ORCH_JSON_LOGS` | `false` (`true` in containers) | JSON formatted output |
//! | `ORCH_CONSOLE_OUTPUT` | `true` | Emit logs to stdout at all |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to install subscriber: {0}")]
    SubscriberInit(String),
}

/// Convenience macro for creating a span with module context.
///
/// ```rust,ignore
/// let _span = module_span!("process_request", module_id = "dialer_ai");
/// ```
#[macro_export]
macro_rules! module_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
