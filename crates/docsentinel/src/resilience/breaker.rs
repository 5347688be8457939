//! Circuit breaker guarding one external dependency.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Current position of the breaker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed,
    /// Too many consecutive failures; calls are rejected without execution.
    Open,
    /// Recovery timeout elapsed; exactly one probe call is allowed through.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Error surface of a guarded call.
///
/// `Open` never originates from the dependency — it signals "we chose not to
/// try", so callers can tell a rejected call from a failed one. `Inner`
/// re-raises the operation's error unchanged.
#[derive(Error, Debug)]
pub enum GuardError<E>
where
    E: std::error::Error,
{
    #[error("circuit breaker '{dependency}' is open; recovery in {remaining_secs}s ({failures} consecutive failures)")]
    Open {
        dependency: String,
        remaining_secs: u64,
        failures: u32,
    },

    #[error(transparent)]
    Inner(E),
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker protecting one dependency from sustained overload.
///
/// State is mutex-guarded so a single instance can be shared by all worker
/// threads calling the same dependency. State lives in-process only and
/// resets on restart; the dependency's true health does not depend on this
/// process's history.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: &str, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failures: 0,
                last_failure: None,
            }),
        }
    }

    /// Executes `op` through the breaker.
    ///
    /// While open and inside the recovery window the operation is never
    /// invoked. The open→half-open transition happens lazily here, on the
    /// first call after the timeout elapses — there is no background timer.
    pub fn call<T, E, F>(&self, op: F) -> Result<T, GuardError<E>>
    where
        E: std::error::Error,
        F: FnOnce() -> Result<T, E>,
    {
        {
            let mut guard = self.inner.lock().expect("breaker lock poisoned");
            if guard.state == CircuitState::Open {
                let elapsed = guard
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(self.recovery_timeout);
                if elapsed >= self.recovery_timeout {
                    guard.state = CircuitState::HalfOpen;
                    log::info!("Circuit breaker '{}' half-open, testing recovery", self.name);
                } else {
                    let remaining = self.recovery_timeout - elapsed;
                    return Err(GuardError::Open {
                        dependency: self.name.clone(),
                        remaining_secs: remaining.as_secs(),
                        failures: guard.failures,
                    });
                }
            }
        }

        match op() {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(GuardError::Inner(e))
            }
        }
    }

    fn on_success(&self) {
        let mut guard = self.inner.lock().expect("breaker lock poisoned");
        if guard.state == CircuitState::HalfOpen {
            log::info!("Circuit breaker '{}' recovered, closing circuit", self.name);
        }
        guard.failures = 0;
        guard.state = CircuitState::Closed;
    }

    fn on_failure(&self) {
        let mut guard = self.inner.lock().expect("breaker lock poisoned");
        guard.failures += 1;
        guard.last_failure = Some(Instant::now());

        if guard.failures >= self.failure_threshold {
            guard.state = CircuitState::Open;
            log::error!(
                "Circuit breaker '{}' OPEN after {} failures. Will retry in {}s.",
                self.name,
                guard.failures,
                self.recovery_timeout.as_secs()
            );
        }
    }

    /// Whether a call would currently be attempted.
    ///
    /// Side-effect free: querying availability never flips open→half-open;
    /// only an actual `call` does that.
    pub fn is_available(&self) -> bool {
        let guard = self.inner.lock().expect("breaker lock poisoned");
        if guard.state == CircuitState::Open {
            return guard
                .last_failure
                .map(|at| at.elapsed() >= self.recovery_timeout)
                .unwrap_or(true);
        }
        true
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    pub fn failures(&self) -> u32 {
        self.inner.lock().expect("breaker lock poisoned").failures
    }
}
