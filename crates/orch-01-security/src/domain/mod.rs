//! Domain layer of the security engine.

pub mod audit;
pub mod communication;
pub mod policy;
pub mod rate_limit;
pub mod sanitize;
