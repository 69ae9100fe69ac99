use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// No rule matched and no fallback is configured.
    #[error("Unable to determine target module")]
    NoMatchingRule,

    /// A context pattern failed to compile.
    #[error("Invalid context pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A rule is unusable as written.
    #[error("Invalid rule for {target_module}: {reason}")]
    InvalidRule {
        target_module: String,
        reason: String,
    },
}
