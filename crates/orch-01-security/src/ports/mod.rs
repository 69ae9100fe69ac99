//! Hexagonal ports for the security engine.

pub mod inbound;
pub mod outbound;
