//! Cross-crate integration flows.

pub mod fixtures;

mod breaker_flows;
mod routing_flows;
mod security_flows;
