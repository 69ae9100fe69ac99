//! Stand-in capability modules for the `orchestrator` binary.
//!
//! They acknowledge requests with a canned summary; none of them performs
//! real analysis, dialing or lead lookups.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use orch_03_module_pipeline::{ModuleLogic, ModuleOutput};
use serde_json::json;
use shared_types::{ModuleError, ProcessingContext};

/// Module id, summary and suggested next actions for each module the
/// default routing table points at.
const DEMO_TABLE: [(&str, &str, &[&str]); 5] = [
    ("general_assistant", "General assistance request received", &["ask_follow_up"]),
    ("lead_profile_ai", "Lead profile request received", &["open_lead", "log_note"]),
    ("dialer_ai", "Call assistance request received", &["start_call"]),
    ("analytics_ai", "Analytics request received", &["open_report"]),
    ("academy_ai", "Training request received", &["open_course"]),
];

pub fn demo_module_ids() -> impl Iterator<Item = &'static str> {
    DEMO_TABLE.iter().map(|(id, _, _)| *id)
}

pub struct DemoModule {
    module_id: String,
    summary: &'static str,
    next_actions: &'static [&'static str],
    ready: AtomicBool,
    handled: AtomicU64,
}

impl DemoModule {
    pub fn new(
        module_id: impl Into<String>,
        summary: &'static str,
        next_actions: &'static [&'static str],
    ) -> Self {
        Self {
            module_id: module_id.into(),
            summary,
            next_actions,
            ready: AtomicBool::new(false),
            handled: AtomicU64::new(0),
        }
    }

    /// Demo module for one of [`demo_module_ids`]; `None` for anything else.
    pub fn for_id(module_id: &str) -> Option<Self> {
        DEMO_TABLE
            .iter()
            .find(|(id, _, _)| *id == module_id)
            .map(|(id, summary, next_actions)| Self::new(*id, *summary, *next_actions))
    }

    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ModuleLogic for DemoModule {
    async fn initialize_module(&self) -> Result<(), ModuleError> {
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn process_request(
        &self,
        sanitized_input: &str,
        context: &ProcessingContext,
    ) -> Result<ModuleOutput, ModuleError> {
        let handled = self.handled.fetch_add(1, Ordering::Relaxed) + 1;
        let data = json!({
            "module": self.module_id,
            "summary": self.summary,
            "request": sanitized_input,
            "session_id": context.session_id,
            "handled": handled,
        });
        Ok(ModuleOutput::new(data).with_next_actions(self.next_actions.iter().copied()))
    }

    async fn perform_health_check(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn cleanup_module(&self) -> Result<(), ModuleError> {
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }
}
