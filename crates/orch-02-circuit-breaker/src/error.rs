use std::time::Duration;

use thiserror::Error;

/// Why a guarded call did not produce the operation's own result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError<E> {
    /// Circuit is open; the operation was not invoked.
    #[error("Circuit open, retry in {retry_after_ms}ms")]
    Open { retry_after_ms: u64 },

    /// The operation missed its deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation ran and failed.
    #[error("{0}")]
    Inner(E),
}
