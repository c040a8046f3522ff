//! Passive health checking (request outcomes).
//!
//! # Responsibilities
//! - Observe request outcomes reported by callers
//! - Feed latency EWMA, totals and the circuit breaker
//! - Force an endpoint down on hard failures
//!
//! # Design Decisions
//! - Plain failures only feed the circuit breaker; status flips stay with
//!   the prober's hysteresis
//! - Hard failures (connection refused, reset) short-circuit to Down;
//!   periodic probes bring the endpoint back

use std::time::Duration;

use crate::registry::{Endpoint, Transition};

/// Result of a request as reported by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The endpoint answered badly (5xx, timeout).
    Failure,
    /// The endpoint could not be reached at all.
    HardFailure,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

/// Apply an outcome to the endpoint.
pub fn record_outcome(endpoint: &Endpoint, outcome: Outcome, latency: Duration) -> Option<Transition> {
    endpoint.stats().record(outcome.is_success(), latency);

    if outcome == Outcome::HardFailure {
        endpoint.force_down()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AvailabilityConfig;
    use crate::discovery::ServiceInstance;
    use crate::registry::{EndpointStats, HealthStatus};

    fn endpoint() -> Endpoint {
        Endpoint::new(
            &ServiceInstance::new("a", 80),
            EndpointStats::new(0.8, &AvailabilityConfig::default()),
        )
    }

    #[test]
    fn test_soft_failure_keeps_status() {
        let ep = endpoint();
        for _ in 0..10 {
            assert!(record_outcome(&ep, Outcome::Failure, Duration::from_millis(3)).is_none());
        }
        assert!(ep.is_available());
        assert_eq!(ep.stats().failures(), 10);
        assert!(ep.stats().circuit().is_open());
    }

    #[test]
    fn test_hard_failure_forces_down() {
        let ep = endpoint();
        let t = record_outcome(&ep, Outcome::HardFailure, Duration::from_millis(1)).unwrap();
        assert_eq!(t.to, HealthStatus::Down);
        // Already down: no second transition.
        assert!(record_outcome(&ep, Outcome::HardFailure, Duration::from_millis(1)).is_none());
    }
}
