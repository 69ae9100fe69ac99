//! # ORCH-05: Task Router
//!
//! Maps a free-form request plus its context to the id of the module that
//! should handle it, using a static table of delegation rules.
//!
//! Rules are tried in descending priority, declaration order breaking ties.
//! A rule matches when one of its keywords occurs in the input (ignoring
//! case) and, if it has context patterns, one of them matches the caller's
//! location, entity reference or serialized metadata.

pub mod config;
pub mod error;
pub mod router;
pub mod rule;

pub use config::{default_rules, DelegationRuleConfig, RouterConfig};
pub use error::RouterError;
pub use router::{RouteDecision, TaskRouter};
pub use rule::DelegationRule;
