//! # Orchestrator Binary
//!
//! Registers the demo modules, then reads one request per line from stdin,
//! dispatches it through the router and prints the outcome as JSON.
//!
//! ```text
//! $ echo "pull the conversion report" | orchestrator
//! {"route":{"target_module":"analytics_ai",...},"response":{"success":true,...}}
//! ```
//!
//! Logging goes to stdout as configured by `orch-telemetry`; set
//! `ORCH_CONSOLE_OUTPUT=false` to keep stdout to responses only.

use anyhow::{Context, Result};
use orch_runtime::{demo_module_ids, DemoModule, Orchestrator, OrchestratorConfig};
use orch_telemetry::{init_logging, TelemetryConfig};
use serde_json::json;
use shared_types::{ModuleConfig, ProcessingContext};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

const DEMO_TENANT: &str = "demo";
const DEMO_PRINCIPAL: &str = "operator";

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _logging = init_logging(&telemetry).context("Failed to initialize logging")?;

    let config = OrchestratorConfig::load().context("Failed to load configuration")?;
    let orchestrator = Orchestrator::new(config).context("Failed to build orchestrator")?;
    orchestrator.start_maintenance();

    for module_id in demo_module_ids() {
        let logic = DemoModule::for_id(module_id)
            .with_context(|| format!("No demo module for {module_id}"))?;
        orchestrator
            .register_module(
                ModuleConfig::new(module_id, DEMO_TENANT, DEMO_PRINCIPAL),
                logic,
            )
            .await
            .with_context(|| format!("Failed to register {module_id}"))?;
    }

    info!("===========================================");
    info!("  Module Orchestrator v{}", env!("CARGO_PKG_VERSION"));
    info!("  Modules: {}", orchestrator.all_statuses().len());
    info!("===========================================");

    let result = serve_stdin(&orchestrator).await;

    let failures = orchestrator.shutdown().await;
    for failure in &failures {
        warn!(error = %failure, "Module cleanup failed during shutdown");
    }
    result
}

/// One request per line until EOF or Ctrl-C.
async fn serve_stdin(orchestrator: &Orchestrator) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break;
            }
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let context = ProcessingContext::new(DEMO_TENANT, DEMO_PRINCIPAL);
        let output = match orchestrator.dispatch(input, Some(context)).await {
            Ok(dispatch) => serde_json::to_string(&dispatch)?,
            Err(e) => {
                error!(error = %e, "Dispatch failed");
                json!({ "error": e.to_string() }).to_string()
            }
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
