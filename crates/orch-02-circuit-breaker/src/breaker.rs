//! The breaker itself.
//!
//! State lives behind a `parking_lot::Mutex` that is only held for the
//! bookkeeping before and after a call, never across the `.await`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared_types::{SystemTimeSource, TimeSource, Timestamp};
use tracing::{debug, info, warn};

use crate::config::CircuitBreakerConfig;
use crate::error::BreakerError;
use crate::state::{CircuitState, CircuitStats};

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    last_fail_time: Option<Timestamp>,
    last_transition: Timestamp,
    total_calls: u64,
    total_failures: u64,
    total_rejections: u64,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    time: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("inner", &*self.inner.lock())
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_time_source(name, config, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let now = time.now();
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                last_fail_time: None,
                last_transition: now,
                total_calls: 0,
                total_failures: 0,
                total_rejections: 0,
            }),
            time,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn failures(&self) -> u32 {
        self.inner.lock().failures
    }

    pub fn last_fail_time(&self) -> Option<Timestamp> {
        self.inner.lock().last_fail_time
    }

    /// Run `op` through the breaker.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Err(retry_after_ms) = self.try_acquire() {
            return Err(BreakerError::Open { retry_after_ms });
        }

        match op().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Like [`execute`](Self::execute), but a call exceeding `deadline` is
    /// abandoned and counted as a failure.
    pub async fn execute_with_timeout<F, Fut, T, E>(
        &self,
        deadline: Duration,
        op: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Err(retry_after_ms) = self.try_acquire() {
            return Err(BreakerError::Open { retry_after_ms });
        }

        match tokio::time::timeout(deadline, op()).await {
            Ok(Ok(value)) => {
                self.on_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                self.on_failure();
                Err(BreakerError::Inner(e))
            }
            Err(_) => {
                warn!(
                    breaker = %self.name,
                    deadline_ms = deadline.as_millis() as u64,
                    "Guarded call timed out"
                );
                self.on_failure();
                Err(BreakerError::Timeout(deadline))
            }
        }
    }

    /// Force the breaker closed with a clean failure count.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        info!(breaker = %self.name, from = %inner.state, "Circuit breaker manually reset");
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.last_fail_time = None;
        inner.last_transition = self.time.now();
    }

    pub fn stats(&self) -> CircuitStats {
        let inner = self.inner.lock();
        CircuitStats {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failures,
            last_failure_at: inner.last_fail_time,
            last_transition_at: inner.last_transition,
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            total_rejections: inner.total_rejections,
        }
    }

    /// Admit or reject a call, moving Open -> HalfOpen once the reset
    /// timeout has elapsed since the last failure. `Err` carries the
    /// remaining wait in milliseconds.
    fn try_acquire(&self) -> Result<(), u64> {
        let now = self.time.now();
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            let last_fail = inner.last_fail_time.unwrap_or(inner.last_transition);
            let elapsed = now.saturating_sub(last_fail);

            if elapsed > self.config.reset_timeout_ms {
                info!(breaker = %self.name, "Circuit breaker transitioning to half-open");
                inner.state = CircuitState::HalfOpen;
                inner.last_transition = now;
            } else {
                inner.total_rejections += 1;
                let retry_after_ms = self.config.reset_timeout_ms.saturating_sub(elapsed);
                debug!(
                    breaker = %self.name,
                    retry_after_ms,
                    "Circuit breaker is open, rejecting call"
                );
                return Err(retry_after_ms);
            }
        }

        inner.total_calls += 1;
        Ok(())
    }

    fn on_success(&self) {
        let now = self.time.now();
        let mut inner = self.inner.lock();
        inner.failures = 0;

        if inner.state == CircuitState::HalfOpen {
            info!(breaker = %self.name, "Circuit breaker closing after successful trial call");
            inner.state = CircuitState::Closed;
            inner.last_transition = now;
        }
    }

    fn on_failure(&self) {
        let now = self.time.now();
        let mut inner = self.inner.lock();
        inner.total_failures += 1;

        match inner.state {
            CircuitState::Closed => {
                if let Some(last) = inner.last_fail_time {
                    if now.saturating_sub(last) > self.config.monitoring_window_ms {
                        inner.failures = 0;
                    }
                }
                inner.failures += 1;
                inner.last_fail_time = Some(now);

                if inner.failures >= self.config.failure_threshold {
                    warn!(
                        breaker = %self.name,
                        failures = inner.failures,
                        threshold = self.config.failure_threshold,
                        reset_timeout_ms = self.config.reset_timeout_ms,
                        "Circuit breaker opening due to failures"
                    );
                    inner.state = CircuitState::Open;
                    inner.last_transition = now;
                }
            }
            CircuitState::HalfOpen => {
                warn!(breaker = %self.name, "Circuit breaker reopening after trial call failure");
                inner.failures += 1;
                inner.state = CircuitState::Open;
                inner.last_fail_time = Some(now);
                inner.last_transition = now;
            }
            CircuitState::Open => {
                // A call admitted before the trip finished late
                inner.last_fail_time = Some(now);
            }
        }
    }
}
