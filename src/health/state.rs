//! Endpoint health state machine.
//!
//! # States
//! - Unknown: never probed (eligible for traffic)
//! - Up: receives traffic
//! - Down: excluded from selection
//!
//! # State Transitions
//! ```text
//! Up/Unknown → Down: consecutive failures >= unhealthy_threshold
//! Down/Unknown → Up: consecutive successes >= healthy_threshold
//! any → Down:        hard request failure (passive, immediate)
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - State changes logged for observability
//! - Counters reset on state transition

use std::time::Instant;

use crate::config::HealthCheckConfig;
use crate::registry::{Endpoint, EndpointId, HealthStatus, Transition};

/// How a single probe ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure,
    /// Counted as a failure.
    Timeout,
}

impl ProbeOutcome {
    pub fn is_success(self) -> bool {
        self == ProbeOutcome::Success
    }
}

/// Transient result of one probe; applied immediately, never stored.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub endpoint: EndpointId,
    pub outcome: ProbeOutcome,
    pub at: Instant,
}

/// Thresholds applied to probe results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

impl From<&HealthCheckConfig> for HealthPolicy {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            healthy_threshold: config.healthy_threshold.max(1),
            unhealthy_threshold: config.unhealthy_threshold.max(1),
        }
    }
}

impl HealthPolicy {
    /// Fold a probe result into the endpoint's status.
    pub fn apply(&self, endpoint: &Endpoint, result: &ProbeResult) -> Option<Transition> {
        if result.outcome.is_success() {
            endpoint.mark_success(self.healthy_threshold)
        } else {
            endpoint.mark_failure(self.unhealthy_threshold)
        }
    }
}

/// Log a status change at a level matching its direction.
pub fn log_transition(service: &str, endpoint: &EndpointId, transition: Transition, cause: &str) {
    match transition.to {
        HealthStatus::Down => tracing::warn!(
            service,
            endpoint = %endpoint,
            from = ?transition.from,
            cause,
            "Endpoint marked down"
        ),
        _ => tracing::info!(
            service,
            endpoint = %endpoint,
            from = ?transition.from,
            cause,
            "Endpoint marked up"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AvailabilityConfig;
    use crate::discovery::ServiceInstance;
    use crate::registry::EndpointStats;

    fn result(endpoint: &Endpoint, outcome: ProbeOutcome) -> ProbeResult {
        ProbeResult {
            endpoint: endpoint.id().clone(),
            outcome,
            at: Instant::now(),
        }
    }

    #[test]
    fn test_hysteresis_with_threshold_three() {
        let policy = HealthPolicy {
            healthy_threshold: 1,
            unhealthy_threshold: 3,
        };
        let ep = Endpoint::new(
            &ServiceInstance::new("b", 80),
            EndpointStats::new(0.8, &AvailabilityConfig::default()),
        );
        policy.apply(&ep, &result(&ep, ProbeOutcome::Success));
        assert_eq!(ep.status(), HealthStatus::Up);

        assert!(policy.apply(&ep, &result(&ep, ProbeOutcome::Failure)).is_none());
        assert!(policy.apply(&ep, &result(&ep, ProbeOutcome::Timeout)).is_none());
        assert_eq!(ep.status(), HealthStatus::Up);

        let t = policy.apply(&ep, &result(&ep, ProbeOutcome::Failure)).unwrap();
        assert_eq!(t.to, HealthStatus::Down);
    }

    #[test]
    fn test_policy_from_config_clamps_zero() {
        let mut config = HealthCheckConfig::default();
        config.healthy_threshold = 0;
        let policy = HealthPolicy::from(&config);
        assert_eq!(policy.healthy_threshold, 1);
        assert_eq!(policy.unhealthy_threshold, 3);
    }
}
