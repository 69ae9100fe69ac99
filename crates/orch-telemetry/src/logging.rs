//! Structured logging setup.
//!
//! Logs carry consistent fields so they can be filtered downstream:
//! - `timestamp`, `level`, `target`: added by the fmt layer
//! - `module_id`: the capability module a line concerns
//! - `tenant_id` / `principal_id`: the policy key on security lines
//!
//! JSON output is meant for containers and log shippers; the human-readable
//! layer is for local development.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Returned by [`init_logging`]; logs a line when the process winds down.
#[derive(Debug)]
pub struct LoggingGuard {
    service_name: String,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Logging shut down");
    }
}

/// Install the global `tracing` subscriber.
///
/// Fails if the filter string is invalid or a subscriber is already set.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::InvalidFilter(e.to_string()))?;

    if !config.console_output {
        tracing_subscriber::registry()
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    } else if config.json_logs {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        service_name: config.service_name.clone(),
    })
}

/// Log a module-scoped event with the standard `module_id` field.
#[macro_export]
macro_rules! log_module_event {
    ($level:ident, $module_id:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            module_id = %$module_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a security event keyed by tenant and principal.
#[macro_export]
macro_rules! log_security_event {
    ($level:ident, $tenant_id:expr, $principal_id:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            tenant_id = %$tenant_id,
            principal_id = %$principal_id,
            $($($field)*,)?
            $msg
        )
    };
}
