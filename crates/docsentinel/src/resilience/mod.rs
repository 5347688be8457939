//! Resilience wrappers for external calls: retry with exponential backoff and
//! per-dependency circuit breakers.

pub mod breaker;
pub mod retry;

use std::sync::Arc;

pub use breaker::{CircuitBreaker, CircuitState, GuardError};
pub use retry::{Retryable, RetryPolicy};

use crate::config::schema::BreakerConfig;

/// Process-wide circuit breakers, one per external dependency.
///
/// Constructed once and cloned by `Arc` into every pipeline worker, so the
/// breakers observe the dependency's health in aggregate rather than per-run.
/// Tests construct their own isolated instances.
#[derive(Debug)]
pub struct SharedBreakers {
    pub llm: CircuitBreaker,
    pub search: CircuitBreaker,
    pub store: CircuitBreaker,
}

impl SharedBreakers {
    pub fn new(llm: BreakerConfig, search: BreakerConfig, store: BreakerConfig) -> Arc<Self> {
        Arc::new(Self {
            llm: CircuitBreaker::new("llm", llm.failure_threshold, llm.recovery_timeout()),
            search: CircuitBreaker::new(
                "search",
                search.failure_threshold,
                search.recovery_timeout(),
            ),
            store: CircuitBreaker::new("store", store.failure_threshold, store.recovery_timeout()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_breakers_start_closed() {
        let breakers = SharedBreakers::new(
            BreakerConfig::default(),
            BreakerConfig::default(),
            BreakerConfig::default(),
        );
        assert_eq!(breakers.llm.state(), CircuitState::Closed);
        assert_eq!(breakers.search.state(), CircuitState::Closed);
        assert_eq!(breakers.store.state(), CircuitState::Closed);
        assert!(breakers.llm.is_available());
    }
}
