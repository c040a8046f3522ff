//! Error taxonomy for the balancer.
//!
//! # Propagation
//! ```text
//! Request path (surfaced to the caller):
//!     NoAvailableEndpoint  → caller applies its own retry/backoff
//!     NotRunning           → lifecycle misuse
//!     AlreadyStarted       → lifecycle misuse
//!     Config               → rejected at build time
//!     BackgroundTask       → reported by stop() when a task died
//!
//! Background tasks (absorbed, logged, retried next tick):
//!     RefreshFailed / Discovery
//!     ProbeTimeout / ProbeFailed
//! ```

use thiserror::Error;

use crate::balancer::lifecycle::BalancerState;

/// Errors produced by the balancer core.
#[derive(Debug, Error)]
pub enum LbError {
    /// The eligible endpoint subset is empty.
    #[error("no available endpoint for service '{service}'")]
    NoAvailableEndpoint { service: String },

    /// `choose()` or `stop()` called while the balancer is not running.
    #[error("load balancer for '{service}' is not running (state: {state:?})")]
    NotRunning { service: String, state: BalancerState },

    /// `start()` called on a balancer that is not stopped.
    #[error("load balancer for '{service}' already started (state: {state:?})")]
    AlreadyStarted { service: String, state: BalancerState },

    /// A server-list refresh did not produce a usable list.
    #[error("server list refresh failed for '{service}': {reason}")]
    RefreshFailed { service: String, reason: String },

    /// The discovery collaborator failed.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A health probe did not complete within its deadline.
    #[error("probe of {endpoint} timed out after {timeout_ms} ms")]
    ProbeTimeout { endpoint: String, timeout_ms: u64 },

    /// A health probe could not be carried out.
    #[error("probe of {endpoint} failed: {reason}")]
    ProbeFailed { endpoint: String, reason: String },

    /// Rejected service config or an unbuildable ping client.
    #[error("configuration error: {0}")]
    Config(String),

    /// A refresh or probe task ended abnormally before `stop()`.
    #[error("background task of '{service}' ended abnormally: {reason}")]
    BackgroundTask { service: String, reason: String },
}

impl LbError {
    /// True for errors the caller may retry against another endpoint.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LbError::NoAvailableEndpoint { .. })
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, LbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let e = LbError::NoAvailableEndpoint { service: "users".into() };
        assert!(e.is_retryable());

        let e = LbError::NotRunning {
            service: "users".into(),
            state: BalancerState::Stopped,
        };
        assert!(!e.is_retryable());
        assert!(e.to_string().contains("not running"));
    }
}
